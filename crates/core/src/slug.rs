//! Headline slugs and the prefix tokens used for headline search.

/// Shortest prefix emitted for a slug word.
const MIN_TOKEN: usize = 3;
/// Longest prefix emitted for a slug word.
const MAX_TOKEN: usize = 8;

/// Serbian-specific replacements, applied before general transliteration.
const REPLACE: &[(&str, &str)] = &[
    ("dž", "dz"),
    ("ш", "s"),
    ("đ", "dj"),
    ("џ", "dz"),
    ("ћ", "c"),
    ("ч", "c"),
    ("ж", "z"),
    ("š", "s"),
    ("ć", "c"),
    ("č", "c"),
    ("ž", "z"),
];

fn transliterate(c: char) -> Option<&'static str> {
    let s = match c {
        'а' => "a",
        'б' => "b",
        'в' => "v",
        'г' => "g",
        'д' => "d",
        'ђ' => "dj",
        'е' => "e",
        'ё' => "e",
        'з' => "z",
        'и' => "i",
        'й' => "j",
        'ј' => "j",
        'к' => "k",
        'л' => "l",
        'љ' => "lj",
        'м' => "m",
        'н' => "n",
        'њ' => "nj",
        'о' => "o",
        'п' => "p",
        'р' => "r",
        'с' => "s",
        'т' => "t",
        'у' => "u",
        'ф' => "f",
        'х' => "h",
        'ц' => "c",
        'щ' => "sc",
        'ъ' | 'ь' => "",
        'ы' => "y",
        'э' => "e",
        'ю' => "ju",
        'я' => "ja",
        'à' | 'á' | 'â' | 'ã' | 'ä' | 'å' | 'ā' | 'ă' | 'ą' => "a",
        'æ' => "ae",
        'ç' | 'ĉ' | 'ċ' => "c",
        'ď' => "d",
        'è' | 'é' | 'ê' | 'ë' | 'ē' | 'ė' | 'ę' | 'ě' => "e",
        'ğ' | 'ģ' => "g",
        'ì' | 'í' | 'î' | 'ï' | 'ī' | 'į' | 'ı' => "i",
        'ķ' => "k",
        'ł' | 'ļ' | 'ľ' => "l",
        'ñ' | 'ń' | 'ņ' | 'ň' => "n",
        'ò' | 'ó' | 'ô' | 'õ' | 'ö' | 'ø' | 'ō' | 'ő' => "o",
        'œ' => "oe",
        'ř' | 'ŕ' => "r",
        'ś' | 'ş' | 'ș' => "s",
        'ß' => "ss",
        'ť' | 'ţ' | 'ț' => "t",
        'ù' | 'ú' | 'û' | 'ü' | 'ū' | 'ů' | 'ű' | 'ų' => "u",
        'ý' | 'ÿ' => "y",
        'ź' | 'ż' => "z",
        _ => return None,
    };
    Some(s)
}

/// Lowercase ASCII slug: words joined by `-`, everything else dropped.
pub fn slugify(text: &str) -> String {
    let mut lowered = text.to_lowercase();
    for (from, to) in REPLACE {
        if lowered.contains(from) {
            lowered = lowered.replace(from, to);
        }
    }

    let mut slug = String::with_capacity(lowered.len());
    let mut pending_dash = false;
    for c in lowered.chars() {
        let mapped: Option<std::borrow::Cow<'static, str>> = if c.is_ascii_alphanumeric() {
            Some(c.to_string().into())
        } else {
            transliterate(c).map(Into::into)
        };
        match mapped {
            Some(part) if !part.is_empty() => {
                if pending_dash && !slug.is_empty() {
                    slug.push('-');
                }
                pending_dash = false;
                slug.push_str(&part);
            }
            Some(_) => {}
            None => pending_dash = true,
        }
    }
    slug
}

/// Prefix tokens of every slug word, lengths 3 through 8.
///
/// `"Summer at Zlatibor"` gives `sum, summ, summe, summer, zla, zlat, ...`;
/// words shorter than three letters contribute nothing.
pub fn slice_slug(text: &str) -> Vec<String> {
    let slug = slugify(text);
    let mut tokens = Vec::new();
    for word in slug.split('-') {
        for len in MIN_TOKEN..=word.len() {
            if len > MAX_TOKEN {
                break;
            }
            tokens.push(word[..len].to_string());
        }
    }
    tokens
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slugify_ascii() {
        assert_eq!(slugify("Summer at  the Lake!"), "summer-at-the-lake");
        assert_eq!(slugify("  --Hello--  "), "hello");
        assert_eq!(slugify(""), "");
    }

    #[test]
    fn test_slugify_serbian() {
        assert_eq!(slugify("Ђурђевдан у Шапцу"), "djurdjevdan-u-sapcu");
        assert_eq!(slugify("Čačak, Niš i Đerdap"), "cacak-nis-i-djerdap");
        assert_eq!(slugify("Џеџа"), "dzedza");
        assert_eq!(slugify("Džep"), "dzep");
    }

    #[test]
    fn test_slugify_drops_unknown_symbols() {
        assert_eq!(slugify("rock & roll ♥ 2024"), "rock-roll-2024");
    }

    #[test]
    fn test_slice_slug_prefixes() {
        assert_eq!(
            slice_slug("Summer at sea"),
            vec!["sum", "summ", "summe", "summer", "sea"]
        );
    }

    #[test]
    fn test_slice_slug_caps_at_eight() {
        let tokens = slice_slug("Photographers");
        assert_eq!(tokens.first().map(String::as_str), Some("pho"));
        assert_eq!(tokens.last().map(String::as_str), Some("photogra"));
        assert_eq!(tokens.len(), 6);
    }

    #[test]
    fn test_slice_slug_empty() {
        assert!(slice_slug("").is_empty());
        assert!(slice_slug("a b").is_empty());
    }
}
