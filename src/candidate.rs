//! Candidate discovery: visible, same-origin, interactive elements (spec §4.3).

use serde::{Deserialize, Serialize};

use crate::browser::BrowserController;
use crate::error::Result;

/// In-page traversal that snapshots every element the page considers
/// potentially interactive, run once per discovery round. Same-origin and
/// disallowed-href filtering happen here too since they need the page's own
/// `location.origin`; visibility, selector assignment, and the
/// [`MAX_CANDIDATES`] bound are applied host-side by [`build_candidates`].
const DISCOVERY_SCRIPT: &str = r#"
(() => {
  const origin = location.origin;
  const out = [];
  document.querySelectorAll('input, textarea, select, button, a, [onclick], [role]').forEach((el) => {
    const rect = el.getBoundingClientRect();
    const style = window.getComputedStyle(el);
    out.push({
      tag: el.tagName.toLowerCase(),
      role: el.getAttribute('role'),
      id: el.id || null,
      name: el.getAttribute('name'),
      text: (el.innerText || el.value || '').trim(),
      class_list: Array.from(el.classList),
      input_type: el.getAttribute('type'),
      href: el.getAttribute('href'),
      has_onclick: !!el.onclick || el.hasAttribute('onclick'),
      disabled: !!el.disabled,
      same_origin: !el.href || el.href.startsWith(origin) || el.getAttribute('href')?.startsWith('/') || el.getAttribute('href')?.startsWith('#'),
      rect: { x: rect.x, y: rect.y, width: rect.width, height: rect.height },
      opacity: parseFloat(style.opacity),
      display_visible: style.display !== 'none' && style.visibility !== 'hidden',
      top_within_two_viewports: rect.top <= window.innerHeight * 2,
    });
  });
  return out;
})()
"#;

/// Run one discovery round against `browser`: evaluate [`DISCOVERY_SCRIPT`]
/// in the page, deserialize the raw elements, and filter/bound them into
/// [`ActionCandidate`]s via [`build_candidates`].
pub async fn discover_candidates(browser: &dyn BrowserController) -> Result<Vec<ActionCandidate>> {
    let raw_value = browser.evaluate(DISCOVERY_SCRIPT).await?;
    let raw_elements: Vec<RawElement> = serde_json::from_value(raw_value)?;
    Ok(build_candidates(raw_elements))
}

/// Maximum number of candidates kept after one discovery round.
pub const MAX_CANDIDATES: usize = 50;

/// Kind of an [`ActionCandidate`], decided by tag + role + attributes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CandidateKind {
    Input,
    Button,
    Link,
    Onclick,
    Select,
    Unknown,
}

impl std::fmt::Display for CandidateKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Input => write!(f, "input"),
            Self::Button => write!(f, "button"),
            Self::Link => write!(f, "link"),
            Self::Onclick => write!(f, "onclick"),
            Self::Select => write!(f, "select"),
            Self::Unknown => write!(f, "unknown"),
        }
    }
}

/// Bounding rectangle of a discovered element, in viewport pixels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingRect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl BoundingRect {
    /// Whether the rect has nonzero area.
    pub fn is_visible_size(&self) -> bool {
        self.width > 0.0 && self.height > 0.0
    }
}

/// A visible, same-origin, interactable element discovered in one round.
///
/// Candidates are ephemeral: discovered each round, not owned across rounds.
/// Equality (and thus identity across rounds) is selector + kind based, per
/// spec §3's invariant.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionCandidate {
    /// Stable selector: `#id` > `tag[name="…"]` > text-derived > nth-of-type.
    pub selector: String,
    pub kind: CandidateKind,
    /// Truncated textual label.
    pub label: String,
    /// Form-input `type` attribute, if any.
    pub input_type: Option<String>,
    pub href: Option<String>,
    pub has_onclick: bool,
    pub rect: BoundingRect,
}

const LABEL_MAX_LEN: usize = 120;

impl ActionCandidate {
    /// Create a candidate, truncating its label to the spec-mandated bound.
    pub fn new(selector: impl Into<String>, kind: CandidateKind, label: impl Into<String>) -> Self {
        let mut label = label.into();
        if label.len() > LABEL_MAX_LEN {
            label.truncate(LABEL_MAX_LEN);
        }
        Self {
            selector: selector.into(),
            kind,
            label,
            input_type: None,
            href: None,
            has_onclick: false,
            rect: BoundingRect {
                x: 0.0,
                y: 0.0,
                width: 0.0,
                height: 0.0,
            },
        }
    }

    pub fn with_input_type(mut self, input_type: impl Into<String>) -> Self {
        self.input_type = Some(input_type.into());
        self
    }

    pub fn with_href(mut self, href: impl Into<String>) -> Self {
        self.href = Some(href.into());
        self
    }

    pub fn with_onclick(mut self, has_onclick: bool) -> Self {
        self.has_onclick = has_onclick;
        self
    }

    pub fn with_rect(mut self, rect: BoundingRect) -> Self {
        self.rect = rect;
        self
    }

    /// Identity key for cross-round equality: selector + kind.
    pub fn identity(&self) -> (String, CandidateKind) {
        (self.selector.clone(), self.kind)
    }
}

impl PartialEq for ActionCandidate {
    fn eq(&self, other: &Self) -> bool {
        self.selector == other.selector && self.kind == other.kind
    }
}
impl Eq for ActionCandidate {}

impl std::hash::Hash for ActionCandidate {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.selector.hash(state);
        self.kind.hash(state);
    }
}

/// Raw element snapshot as reported by the in-page discovery traversal,
/// before kind classification and filtering.
#[derive(Debug, Clone, Deserialize)]
pub struct RawElement {
    pub tag: String,
    pub role: Option<String>,
    pub id: Option<String>,
    pub name: Option<String>,
    pub text: Option<String>,
    pub class_list: Vec<String>,
    pub input_type: Option<String>,
    pub href: Option<String>,
    pub has_onclick: bool,
    pub disabled: bool,
    pub same_origin: bool,
    pub rect: BoundingRect,
    pub opacity: f64,
    pub display_visible: bool,
    pub top_within_two_viewports: bool,
}

fn is_disallowed_href(href: &str) -> bool {
    href.starts_with("mailto:") || href.starts_with("tel:") || href.starts_with("javascript:")
}

/// Visibility predicate from spec §4.3: nonzero bbox, non-hidden computed
/// display/visibility, opacity >= 0.1, top within two viewport heights.
fn is_visible(el: &RawElement) -> bool {
    el.rect.is_visible_size()
        && el.display_visible
        && el.opacity >= 0.1
        && el.top_within_two_viewports
}

fn classify_kind(el: &RawElement) -> CandidateKind {
    let tag = el.tag.to_ascii_lowercase();
    let role = el.role.as_deref().unwrap_or("");

    if matches!(tag.as_str(), "input" | "textarea") {
        return CandidateKind::Input;
    }
    if tag == "select" {
        return CandidateKind::Select;
    }
    if tag == "button" || role == "button" {
        return CandidateKind::Button;
    }
    if tag == "a" || role == "link" {
        return CandidateKind::Link;
    }
    if el.has_onclick {
        return CandidateKind::Onclick;
    }
    CandidateKind::Unknown
}

fn css_escape(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for ch in value.chars() {
        if ch.is_ascii_alphanumeric() || ch == '-' || ch == '_' {
            escaped.push(ch);
        } else {
            escaped.push('\\');
            escaped.push(ch);
        }
    }
    escaped
}

/// Generate a selector for a raw element, trying the preference order from
/// spec §4.3: `#id` -> `tag[name="…"]` -> text-derived -> `tag.class` ->
/// `tag:nth-of-type(n)`.
fn generate_selector(el: &RawElement, nth_of_type: usize) -> String {
    if let Some(id) = &el.id {
        if !id.is_empty() {
            return format!("#{}", css_escape(id));
        }
    }
    if let Some(name) = &el.name {
        if !name.is_empty() {
            return format!("{}[name=\"{}\"]", el.tag, name);
        }
    }
    if matches!(el.tag.as_str(), "a" | "button") {
        if let Some(text) = el.text.as_deref().map(str::trim) {
            if !text.is_empty() {
                return format!("{}:has-text(\"{}\")", el.tag, text);
            }
        }
    }
    if let Some(class) = el.class_list.first() {
        return format!("{}.{}", el.tag, class);
    }
    format!("{}:nth-of-type({})", el.tag, nth_of_type)
}

/// Turn raw in-page element snapshots into a bounded candidate list.
///
/// Filters by visibility and same-origin/disallowed-href exclusions, assigns
/// selectors and kinds, then truncates to [`MAX_CANDIDATES`].
pub fn build_candidates(raw_elements: Vec<RawElement>) -> Vec<ActionCandidate> {
    let mut candidates = Vec::new();
    let mut nth_counter: std::collections::HashMap<String, usize> = std::collections::HashMap::new();

    for el in raw_elements {
        if el.disabled || !el.same_origin {
            continue;
        }
        if let Some(href) = &el.href {
            if !el.same_origin || is_disallowed_href(href) {
                continue;
            }
        }
        if !is_visible(&el) {
            continue;
        }

        let nth = nth_counter.entry(el.tag.clone()).or_insert(0);
        *nth += 1;
        let selector = generate_selector(&el, *nth);
        let kind = classify_kind(&el);
        let label = el.text.clone().unwrap_or_default();

        let mut candidate = ActionCandidate::new(selector, kind, label).with_onclick(el.has_onclick);
        if let Some(input_type) = &el.input_type {
            candidate = candidate.with_input_type(input_type.clone());
        }
        if let Some(href) = &el.href {
            candidate = candidate.with_href(href.clone());
        }
        candidate = candidate.with_rect(el.rect);

        candidates.push(candidate);
        if candidates.len() >= MAX_CANDIDATES {
            break;
        }
    }

    candidates
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_element(tag: &str) -> RawElement {
        RawElement {
            tag: tag.to_string(),
            role: None,
            id: None,
            name: None,
            text: None,
            class_list: Vec::new(),
            input_type: None,
            href: None,
            has_onclick: false,
            disabled: false,
            same_origin: true,
            rect: BoundingRect {
                x: 0.0,
                y: 0.0,
                width: 10.0,
                height: 10.0,
            },
            opacity: 1.0,
            display_visible: true,
            top_within_two_viewports: true,
        }
    }

    #[test]
    fn id_selector_preferred() {
        let mut el = base_element("button");
        el.id = Some("submit-btn".to_string());
        let candidates = build_candidates(vec![el]);
        assert_eq!(candidates[0].selector, "#submit-btn");
        assert_eq!(candidates[0].kind, CandidateKind::Button);
    }

    #[test]
    fn disallowed_href_excluded() {
        let mut el = base_element("a");
        el.href = Some("mailto:test@example.com".to_string());
        assert!(build_candidates(vec![el]).is_empty());
    }

    #[test]
    fn invisible_elements_excluded() {
        let mut el = base_element("a");
        el.rect.width = 0.0;
        assert!(build_candidates(vec![el]).is_empty());

        let mut el = base_element("a");
        el.opacity = 0.05;
        assert!(build_candidates(vec![el]).is_empty());
    }

    #[test]
    fn onclick_without_native_role_classified_onclick() {
        let mut el = base_element("div");
        el.has_onclick = true;
        let candidates = build_candidates(vec![el]);
        assert_eq!(candidates[0].kind, CandidateKind::Onclick);
    }

    #[test]
    fn nth_of_type_fallback_increments() {
        let el1 = base_element("div");
        let mut el2 = base_element("div");
        el2.has_onclick = false;
        let candidates = build_candidates(vec![el1, el2]);
        assert_eq!(candidates[0].selector, "div:nth-of-type(1)");
        assert_eq!(candidates[1].selector, "div:nth-of-type(2)");
    }

    #[test]
    fn bounded_to_max_candidates() {
        let elements: Vec<_> = (0..100).map(|_| base_element("div")).collect();
        let candidates = build_candidates(elements);
        assert_eq!(candidates.len(), MAX_CANDIDATES);
    }

    #[test]
    fn identity_is_selector_and_kind() {
        let mut el = base_element("button");
        el.id = Some("go".into());
        let candidates = build_candidates(vec![el]);
        let c = &candidates[0];
        assert_eq!(c.identity(), ("#go".to_string(), CandidateKind::Button));
    }
}
