use crate::error::ErrorKind;
use serde::Serialize;
use time::{Duration, OffsetDateTime};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notice {
    pub kind: ErrorKind,
    pub message: String,
    #[serde(with = "time::serde::rfc3339")]
    pub raised_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub expires_at: OffsetDateTime,
}

/// Holds at most one transient error message. A newer notice replaces the
/// older one; reading past `expires_at` clears it.
#[derive(Debug, Clone)]
pub struct NoticeBoard {
    ttl: Duration,
    current: Option<Notice>,
}

impl NoticeBoard {
    pub fn new(ttl_ms: u64) -> Self {
        Self {
            ttl: Duration::milliseconds(i64::try_from(ttl_ms).unwrap_or(i64::MAX)),
            current: None,
        }
    }

    pub fn raise(&mut self, kind: ErrorKind, message: impl Into<String>) -> &Notice {
        self.raise_at(kind, message, OffsetDateTime::now_utc())
    }

    pub fn raise_at(
        &mut self,
        kind: ErrorKind,
        message: impl Into<String>,
        now: OffsetDateTime,
    ) -> &Notice {
        let message = message.into();
        tracing::debug!(?kind, %message, "notice raised");
        self.current.insert(Notice {
            kind,
            message,
            raised_at: now,
            expires_at: now.saturating_add(self.ttl),
        })
    }

    pub fn current(&mut self) -> Option<&Notice> {
        self.current_at(OffsetDateTime::now_utc())
    }

    pub fn current_at(&mut self, now: OffsetDateTime) -> Option<&Notice> {
        if self.current.as_ref().is_some_and(|n| now >= n.expires_at) {
            self.current = None;
        }
        self.current.as_ref()
    }

    pub fn clear(&mut self) {
        self.current = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn notice_expires_after_ttl() {
        let mut board = NoticeBoard::new(2000);
        let t0 = OffsetDateTime::UNIX_EPOCH;
        board.raise_at(ErrorKind::IllegalSelection, "Only empty parcels can be selected.", t0);

        let live = board.current_at(t0 + Duration::milliseconds(1999)).cloned();
        assert_eq!(live.map(|n| n.kind), Some(ErrorKind::IllegalSelection));
        assert!(board.current_at(t0 + Duration::seconds(2)).is_none());
        // stays cleared
        assert!(board.current_at(t0).is_none());
    }

    #[test]
    fn newer_notice_replaces_older() {
        let mut board = NoticeBoard::new(2000);
        let t0 = OffsetDateTime::UNIX_EPOCH;
        board.raise_at(ErrorKind::IllegalSelection, "a", t0);
        board.raise_at(ErrorKind::RpcFailure, "b", t0);
        let n = board.current_at(t0).unwrap();
        assert_eq!(n.kind, ErrorKind::RpcFailure);
        assert_eq!(n.message, "b");
        board.clear();
        assert!(board.current_at(t0).is_none());
    }
}
