use libris_catalog::BookId;
use time::UtcDateTime;
use uuid::Uuid;

/// Source of identifiers for newly ingested books.
pub trait IdGenerator: Send + Sync {
    fn generate(&self) -> BookId;
}

/// Time-ordered UUIDv7 identifiers.
#[derive(Debug, Default, Clone, Copy)]
pub struct UuidV7;

impl IdGenerator for UuidV7 {
    fn generate(&self) -> BookId {
        BookId::from(Uuid::now_v7())
    }
}

/// Source of creation and update timestamps.
pub trait Clock: Send + Sync {
    fn now(&self) -> UtcDateTime;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> UtcDateTime {
        UtcDateTime::now()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_uuid_v7_is_time_ordered() {
        let ids: Vec<BookId> = (0..16).map(|_| UuidV7.generate()).collect();
        assert!(ids.iter().all(|id| id.as_uuid().get_version_num() == 7));
        let mut sorted = ids.clone();
        sorted.sort();
        assert_eq!(ids, sorted);
    }
}
