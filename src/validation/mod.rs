/// Input validation and sanitization
///
/// Every free-text field of a broadcast request passes through here before it
/// reaches the directory or the mail transport. `validate` rejects, `sanitize`
/// neutralizes; both are pure.
use lazy_static::lazy_static;
use regex::Regex;
use validator::ValidateEmail;

pub const PILLAR_MAX_CHARS: usize = 100;
pub const SUBJECT_MAX_CHARS: usize = 200;
pub const CONTENT_MAX_CHARS: usize = 10_000;

lazy_static! {
    static ref PILLAR_CHARS: Regex = Regex::new(r"^[A-Za-z0-9\s\-_]+$").unwrap();

    static ref SCRIPT_BLOCK: Regex =
        Regex::new(r"(?is)<\s*script\b[^>]*>.*?<\s*/\s*script\s*>").unwrap();
    static ref URI_SCHEME: Regex = Regex::new(r"(?i)(?:javascript|vbscript|data)\s*:").unwrap();
    static ref EVENT_HANDLER: Regex = Regex::new(r"(?i)\bon[a-z]+\s*=").unwrap();

    /// Markup that is rejected outright rather than neutralized
    static ref DANGEROUS_PATTERNS: Vec<Regex> = [
        r"(?i)<\s*script\b",
        r"(?i)<\s*/\s*script\s*>",
        r"(?i)javascript\s*:",
        r"(?i)vbscript\s*:",
        r"(?i)data\s*:",
        r"(?i)\bon[a-z]+\s*=",
        r"(?i)<\s*(?:iframe|object|embed|form|link|meta)\b",
        r"(?i)\beval\s*\(",
        r"(?i)\bexpression\s*\(",
    ]
    .iter()
    .map(|p| Regex::new(p).unwrap())
    .collect();
}

/// Neutralize untrusted text for embedding in an HTML email
///
/// Script blocks, script-capable URI schemes and inline event handlers are
/// removed first (repeatedly, so removals cannot splice a new match together),
/// then HTML metacharacters are entity-escaped.
pub fn sanitize(text: &str) -> String {
    let mut current = text.to_string();
    loop {
        let stripped = SCRIPT_BLOCK.replace_all(&current, "");
        let stripped = URI_SCHEME.replace_all(&stripped, "");
        let stripped = EVENT_HANDLER.replace_all(&stripped, "").into_owned();
        if stripped == current {
            break;
        }
        current = stripped;
    }

    escape_html(&current)
}

fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            '/' => out.push_str("&#x2F;"),
            '`' => out.push_str("&#x60;"),
            '=' => out.push_str("&#x3D;"),
            other => out.push(other),
        }
    }
    out
}

/// Check a broadcast request, returning every violated constraint
///
/// An empty vector means the request is acceptable.
pub fn validate(pillar: &str, subject: &str, content: &str) -> Vec<String> {
    let mut errors = Vec::new();

    if pillar.trim().is_empty() {
        errors.push("Pillar is required".to_string());
    } else {
        if pillar.chars().count() > PILLAR_MAX_CHARS {
            errors.push(format!(
                "Pillar must be at most {} characters",
                PILLAR_MAX_CHARS
            ));
        }
        if !PILLAR_CHARS.is_match(pillar) {
            errors.push("Pillar contains invalid characters".to_string());
        }
    }

    if subject.trim().is_empty() {
        errors.push("Subject is required".to_string());
    } else if subject.chars().count() > SUBJECT_MAX_CHARS {
        errors.push(format!(
            "Subject must be at most {} characters",
            SUBJECT_MAX_CHARS
        ));
    }

    if content.trim().is_empty() {
        errors.push("Content is required".to_string());
    } else if content.chars().count() > CONTENT_MAX_CHARS {
        errors.push(format!(
            "Content must be at most {} characters",
            CONTENT_MAX_CHARS
        ));
    }

    let combined = format!("{}\n{}\n{}", pillar, subject, content);
    if contains_dangerous_markup(&combined) {
        errors.push("Content contains potentially dangerous markup".to_string());
    }

    errors
}

/// Heuristic denylist match; layered under `sanitize`, not a substitute for it
pub fn contains_dangerous_markup(text: &str) -> bool {
    DANGEROUS_PATTERNS.iter().any(|re| re.is_match(text))
}

/// Syntactic address check applied to directory data at send time
pub fn is_valid_email(address: &str) -> bool {
    let address = address.trim();
    if address.is_empty() || address.chars().any(char::is_whitespace) {
        return false;
    }

    match address.rsplit_once('@') {
        Some((_, domain)) if domain.contains('.') && !domain.ends_with('.') => {
            address.validate_email()
        }
        _ => false,
    }
}
