//! Pattern suggestions derived from the page a user is looking at

use crate::error::SuggestError;
use crate::evaluator::is_web_url;
use crate::rule::RuleKind;
use url::Url;

/// Candidate patterns for a new rule of `kind` targeting `page_url`.
///
/// Redirect rules get exact URLs; storage rules get progressively broader
/// wildcard patterns. Duplicates are dropped, first occurrence wins.
pub fn suggest_patterns(page_url: &str, kind: RuleKind) -> Result<Vec<String>, SuggestError> {
    if !is_web_url(page_url) {
        return Err(SuggestError::NotWebUrl {
            url: page_url.to_string(),
        });
    }

    let parsed = Url::parse(page_url).map_err(|e| SuggestError::InvalidUrl {
        url: page_url.to_string(),
        reason: e.to_string(),
    })?;
    let scheme = parsed.scheme();
    let host = parsed.host_str().unwrap_or_default();

    let candidates = match kind {
        RuleKind::Redirect => vec![
            page_url.to_string(),
            format!("{}://{}", scheme, host),
            format!("{}://{}/", scheme, host),
        ],
        RuleKind::StorageInjection => {
            let mut candidates = vec![
                format!("{}://{}{}", scheme, host, parsed.path()),
                format!("{}://{}/*", scheme, host),
            ];
            let labels: Vec<&str> = host.split('.').collect();
            if labels.len() > 1 {
                candidates.push(format!("*{}/*", labels[labels.len() - 2..].join(".")));
            }
            candidates
        }
    };

    let mut unique: Vec<String> = Vec::with_capacity(candidates.len());
    for candidate in candidates {
        if !unique.contains(&candidate) {
            unique.push(candidate);
        }
    }
    Ok(unique)
}
