//! Source normalizer: turns raw generator output into canonical source.
//!
//! Generator responses arrive wrapped in markdown fences. Normalization
//! removes the known fence markers by exact substring match and appends the
//! evaluation harness, a trailing `render(...)` call that mounts the root
//! component. The function is total and idempotent.

use serde::{Deserialize, Serialize};

/// Fence markers removed from raw generator output, applied in order.
///
/// Longer markers come first so that ```` ```jsx ```` is never reduced to a
/// stray `x` by the shorter ```` ```js ```` rule. Extend the table rather than
/// inferring new fence styles.
pub const FENCE_MARKERS: &[&str] = &["```javascript", "```jsx", "```js", "```"];

/// Symbol every generated source must define; the harness invokes it.
pub const ROOT_COMPONENT: &str = "CodeComponent";

/// Harness template version. Bump when `HARNESS` changes shape.
pub const HARNESS_VERSION: u32 = 1;

/// The evaluation harness appended to every canonical source.
pub const HARNESS: &str = "\n\nrender(\n  <React.StrictMode>\n    <CodeComponent />\n  </React.StrictMode>\n);\n";

/// Unprocessed output from the generator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawGeneration {
    pub text: String,
}

impl RawGeneration {
    pub fn new(text: impl Into<String>) -> Self {
        RawGeneration { text: text.into() }
    }
}

/// Normalized, harness-wrapped component source.
///
/// Produced by [`normalize`] or taken verbatim from an editor edit; edits
/// replace the whole text and are not re-normalized.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CanonicalSource(String);

impl CanonicalSource {
    /// Wrap edited text as the new live source.
    pub fn from_edit(text: impl Into<String>) -> Self {
        CanonicalSource(text.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }

    /// The source with the harness suffix removed, if it is still present.
    pub fn body(&self) -> &str {
        strip_harness(&self.0).unwrap_or(&self.0)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl AsRef<str> for CanonicalSource {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for CanonicalSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Normalize raw generator output into canonical source.
pub fn normalize(raw: &str) -> CanonicalSource {
    let stripped = strip_fences(raw);
    let body = strip_harness(&stripped).unwrap_or(&stripped);
    let mut out = String::with_capacity(body.len() + HARNESS.len());
    out.push_str(body.trim_end());
    out.push_str(HARNESS);
    tracing::debug!(
        raw_len = raw.len(),
        canonical_len = out.len(),
        harness_version = HARNESS_VERSION,
        "normalized generator output"
    );
    CanonicalSource(out)
}

/// Remove every occurrence of each fence marker until none remain.
pub fn strip_fences(raw: &str) -> String {
    let mut text = raw.to_string();
    loop {
        let before = text.len();
        for marker in FENCE_MARKERS {
            if text.contains(marker) {
                text = text.replace(marker, "");
            }
        }
        if text.len() == before {
            return text;
        }
    }
}

/// The source without its harness suffix.
pub fn body_of(source: &CanonicalSource) -> &str {
    source.body()
}

/// True when the text already ends with the evaluation harness.
pub fn has_harness(text: &str) -> bool {
    strip_harness(text).is_some()
}

fn strip_harness(text: &str) -> Option<&str> {
    let trimmed = text.trim_end();
    trimmed
        .strip_suffix(HARNESS.trim())
        .map(|body| body.trim_end())
}
