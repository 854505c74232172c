use serde_json::Value;
use sf_core::{Error, Result};

/// Layout of a JSON object assigned inside an inline script, e.g.
/// `window.__websiteData = {...};</script>`.
///
/// The object is read from the text between `start_marker` and `end_marker`.
/// When the text after the object is not plain separators, the segment is
/// repaired the way the site's layout requires: `trim_tail` characters are
/// dropped from its end and `closing` is appended.
#[derive(Debug, Clone, Copy)]
pub struct EmbeddedJson {
    pub start_marker: &'static str,
    pub end_marker: &'static str,
    pub trim_tail: usize,
    pub closing: &'static str,
}

impl EmbeddedJson {
    pub fn extract(&self, page: &str) -> Result<Value> {
        let segment = self.segment(page)?;

        let mut stream = serde_json::Deserializer::from_str(segment).into_iter::<Value>();
        if let Some(Ok(value @ Value::Object(_))) = stream.next() {
            return Ok(value);
        }

        let repaired = self.repair(segment)?;
        match serde_json::from_str::<Value>(&repaired) {
            Ok(value @ Value::Object(_)) => Ok(value),
            Ok(_) => Err(Error::EmbeddedFormat(format!(
                "{} is not followed by an object",
                self.start_marker.trim()
            ))),
            Err(e) => Err(Error::EmbeddedFormat(format!(
                "{} is not valid JSON: {}",
                self.start_marker.trim(),
                e
            ))),
        }
    }

    fn segment<'a>(&self, page: &'a str) -> Result<&'a str> {
        let start = page
            .find(self.start_marker)
            .map(|pos| pos + self.start_marker.len())
            .ok_or_else(|| {
                Error::EmbeddedFormat(format!("Marker {:?} not found", self.start_marker))
            })?;
        let rest = &page[start..];
        let end = rest.find(self.end_marker).ok_or_else(|| {
            Error::EmbeddedFormat(format!(
                "Marker {:?} not found after {:?}",
                self.end_marker, self.start_marker
            ))
        })?;
        Ok(&rest[..end])
    }

    fn repair(&self, segment: &str) -> Result<String> {
        let count = segment.chars().count();
        if count < self.trim_tail {
            return Err(Error::EmbeddedFormat(format!(
                "Segment after {:?} is shorter than {} characters",
                self.start_marker, self.trim_tail
            )));
        }
        let mut repaired: String = segment.chars().take(count - self.trim_tail).collect();
        repaired.push_str(self.closing);
        Ok(repaired)
    }
}
