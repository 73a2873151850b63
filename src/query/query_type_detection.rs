use serde::Serialize;

const SELECT: &[u8] = b"select";

/// Read/write label of a statement, derived from its leading keyword only
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum StatementClass {
    Read,
    Write,
}

impl StatementClass {
    pub fn is_read(self) -> bool {
        self == StatementClass::Read
    }
}

/// Leading-keyword statement classifier.
///
/// Only a statement whose trimmed text starts with `select` (any case) is a
/// read. There is no tokenizer: leading comments, `WITH ... SELECT`,
/// `EXPLAIN` and multi-statement batches all classify as writes, and the
/// match is a plain prefix, so `selected_rows()` would count as a read too.
/// Callers rely on these exact boundaries.
pub struct QueryTypeDetector;

impl QueryTypeDetector {
    #[inline]
    pub fn classify(sql: &str) -> StatementClass {
        let bytes = sql.trim().as_bytes();
        match bytes.get(..SELECT.len()) {
            Some(prefix) if prefix.eq_ignore_ascii_case(SELECT) => StatementClass::Read,
            _ => StatementClass::Write,
        }
    }

    #[inline]
    pub fn is_read(sql: &str) -> bool {
        Self::classify(sql).is_read()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_select_is_read_in_any_case() {
        assert_eq!(QueryTypeDetector::classify("SELECT * FROM users"), StatementClass::Read);
        assert_eq!(QueryTypeDetector::classify("select * from users"), StatementClass::Read);
        assert_eq!(QueryTypeDetector::classify("SeLeCt 1"), StatementClass::Read);
        assert_eq!(QueryTypeDetector::classify("SELECT"), StatementClass::Read);
    }

    #[test]
    fn test_surrounding_whitespace_is_trimmed() {
        assert_eq!(QueryTypeDetector::classify("   select id from t  "), StatementClass::Read);
        assert_eq!(QueryTypeDetector::classify("\n\tSELECT 1\n"), StatementClass::Read);
    }

    #[test]
    fn test_writes() {
        assert_eq!(QueryTypeDetector::classify("INSERT INTO t VALUES (1)"), StatementClass::Write);
        assert_eq!(QueryTypeDetector::classify("update t set x = 1"), StatementClass::Write);
        assert_eq!(QueryTypeDetector::classify("DELETE FROM t"), StatementClass::Write);
        assert_eq!(QueryTypeDetector::classify("CREATE TABLE t (id INTEGER)"), StatementClass::Write);
        assert_eq!(QueryTypeDetector::classify("BEGIN"), StatementClass::Write);
        assert_eq!(QueryTypeDetector::classify(""), StatementClass::Write);
        assert_eq!(QueryTypeDetector::classify("sel"), StatementClass::Write);
    }

    #[test]
    fn test_narrow_prefix_match_is_preserved() {
        // Reads expressed any other way still go to the primary
        assert_eq!(
            QueryTypeDetector::classify("WITH c AS (SELECT 1) SELECT * FROM c"),
            StatementClass::Write
        );
        assert_eq!(QueryTypeDetector::classify("/* hint */ SELECT 1"), StatementClass::Write);
        assert_eq!(QueryTypeDetector::classify("EXPLAIN SELECT 1"), StatementClass::Write);
        assert_eq!(QueryTypeDetector::classify("(SELECT 1)"), StatementClass::Write);
        // Plain prefix, no word boundary
        assert_eq!(QueryTypeDetector::classify("selectivity"), StatementClass::Read);
    }

    #[test]
    fn test_session_statements_are_not_special() {
        assert_eq!(QueryTypeDetector::classify("SELECT @@session.time_zone"), StatementClass::Read);
        assert_eq!(QueryTypeDetector::classify("SET SESSION sql_mode = ''"), StatementClass::Write);
    }

    #[test]
    fn test_multibyte_text_does_not_panic() {
        assert_eq!(QueryTypeDetector::classify("séléct"), StatementClass::Write);
        assert_eq!(QueryTypeDetector::classify("日本語のテキスト"), StatementClass::Write);
    }
}
