use crate::error::CapacityExceeded;

/// Maximum number of headers kept on a request or response.
pub const MAX_HEADERS: usize = 50;

/// Ordered header list with a fixed upper bound.
///
/// Names keep the case they were inserted with; lookups ignore case.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HeaderList {
    entries: Vec<(String, String)>,
}

impl HeaderList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a header, keeping duplicates.
    pub fn try_append(
        &mut self,
        name: impl Into<String>,
        value: impl Into<String>,
    ) -> Result<(), CapacityExceeded> {
        if self.entries.len() >= MAX_HEADERS {
            return Err(Self::full());
        }
        self.entries.push((name.into(), value.into()));
        Ok(())
    }

    /// Replaces the first header with the same name, or appends.
    pub fn try_set(
        &mut self,
        name: impl Into<String>,
        value: impl Into<String>,
    ) -> Result<(), CapacityExceeded> {
        let name = name.into();
        if let Some(slot) = self
            .entries
            .iter_mut()
            .find(|(k, _)| k.eq_ignore_ascii_case(&name))
        {
            slot.1 = value.into();
            return Ok(());
        }
        self.try_append(name, value)
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn full() -> CapacityExceeded {
        CapacityExceeded {
            table: "header",
            capacity: MAX_HEADERS,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_ignores_case() {
        let mut headers = HeaderList::new();
        headers.try_append("Accept-Encoding", "gzip").unwrap();
        assert_eq!(headers.get("accept-encoding"), Some("gzip"));
    }

    #[test]
    fn set_replaces_existing_value() {
        let mut headers = HeaderList::new();
        headers.try_set("Content-Type", "text/plain").unwrap();
        headers.try_set("content-type", "text/html").unwrap();
        assert_eq!(headers.len(), 1);
        assert_eq!(headers.get("Content-Type"), Some("text/html"));
    }

    #[test]
    fn refuses_past_capacity() {
        let mut headers = HeaderList::new();
        for i in 0..MAX_HEADERS {
            headers.try_append(format!("X-{i}"), "v").unwrap();
        }
        let err = headers.try_append("X-Overflow", "v").unwrap_err();
        assert_eq!(err.capacity, MAX_HEADERS);
        assert_eq!(headers.len(), MAX_HEADERS);
        assert!(!headers.contains("X-Overflow"));
    }
}
