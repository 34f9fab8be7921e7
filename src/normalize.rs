//! Title normalization.
//!
//! The real linguistic folding tables (case, diacritics, whitespace per
//! language) are an external collaborator (§1) — this is the pure function
//! shape the archive calls uniformly on both query and on-disk titles
//! (§4.2). It must be deterministic, idempotent, and side-effect free; the
//! exact folding it performs only has to be *a* sound folding, not *the*
//! original table, since comparisons never mix normalized and raw strings.

/// Fold `s` into its comparison form: lowercase, MediaWiki-style
/// underscore-as-space, collapsed whitespace, common Latin diacritics
/// stripped, leading/trailing whitespace trimmed.
pub fn normalize(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut last_was_space = false;

    for ch in s.chars() {
        let ch = if ch == '_' { ' ' } else { ch };
        let folded = strip_diacritic(ch.to_ascii_lowercase());
        let is_space = folded.is_whitespace();
        if is_space {
            if !last_was_space && !out.is_empty() {
                out.push(' ');
            }
            last_was_space = true;
        } else {
            for lower in folded.to_lowercase() {
                out.push(lower);
            }
            last_was_space = false;
        }
    }

    if out.ends_with(' ') {
        out.pop();
    }
    out
}

fn strip_diacritic(ch: char) -> char {
    match ch {
        'à' | 'á' | 'â' | 'ã' | 'ä' | 'å' | 'ā' | 'ă' | 'ą' => 'a',
        'è' | 'é' | 'ê' | 'ë' | 'ē' | 'ĕ' | 'ė' | 'ę' | 'ě' => 'e',
        'ì' | 'í' | 'î' | 'ï' | 'ī' | 'ĭ' | 'į' => 'i',
        'ò' | 'ó' | 'ô' | 'õ' | 'ö' | 'ø' | 'ō' | 'ŏ' | 'ő' => 'o',
        'ù' | 'ú' | 'û' | 'ü' | 'ū' | 'ŭ' | 'ů' | 'ű' | 'ų' => 'u',
        'ý' | 'ÿ' => 'y',
        'ñ' | 'ń' | 'ņ' | 'ň' => 'n',
        'ç' | 'ć' | 'ĉ' | 'ċ' | 'č' => 'c',
        'ß' => 's',
        other => other,
    }
}

/// `true` ⇒ apply `normalize`; `false` ⇒ identity, per §4.2.
pub fn normalize_fn(normalized_titles: bool) -> impl Fn(&str) -> String {
    move |s: &str| {
        if normalized_titles {
            normalize(s)
        } else {
            s.to_string()
        }
    }
}
