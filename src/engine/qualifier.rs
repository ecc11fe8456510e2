use crate::common::types::FeedEvent;
use crate::config::types::TradingConfig;

/// Why a post was not acted on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    WrongAccount,
    Repost,
    Reply,
    MissingText,
    NoKeyword,
}

/// Decides whether a post from the feed should trigger a buy
#[derive(Debug, Clone)]
pub struct EventQualifier {
    tracked_account: String,
    keyword: String,
}

impl EventQualifier {
    pub fn new(tracked_account: impl Into<String>, keyword: impl Into<String>) -> Self {
        Self {
            tracked_account: tracked_account.into(),
            keyword: keyword.into().to_lowercase(),
        }
    }

    pub fn from_config(config: &TradingConfig) -> Self {
        Self::new(&config.tracked_account, config.keyword())
    }

    pub fn keyword(&self) -> &str {
        &self.keyword
    }

    /// Check a post; a missing account or text fails closed
    pub fn check(&self, event: &FeedEvent) -> Result<(), Rejection> {
        match event.account.as_deref() {
            Some(account) if account.eq_ignore_ascii_case(&self.tracked_account) => {}
            _ => return Err(Rejection::WrongAccount),
        }
        if event.is_repost {
            return Err(Rejection::Repost);
        }
        if event.is_reply() {
            return Err(Rejection::Reply);
        }
        let text = event.text.as_deref().ok_or(Rejection::MissingText)?;
        if !text.to_lowercase().contains(&self.keyword) {
            return Err(Rejection::NoKeyword);
        }
        Ok(())
    }
}
