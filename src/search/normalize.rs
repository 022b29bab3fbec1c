use lazy_static::lazy_static;
use regex::Regex;

/// Display names are capped so suggestion rows stay on one line.
const MAX_NAME_CHARS: usize = 50;

/// English food terms mapped to the canonical local names, ordered by
/// descending specificity: an entry must come before every entry that is a
/// substring of it ("chicken breast" before "chicken").
const KEYWORD_TABLE: &[(&str, &str)] = &[
    ("chicken breast", "Куриная грудка"),
    ("chicken fillet", "Куриное филе"),
    ("chicken", "Курица"),
    ("turkey breast", "Грудка индейки"),
    ("turkey", "Индейка"),
    ("ground beef", "Говяжий фарш"),
    ("beef", "Говядина"),
    ("pork", "Свинина"),
    ("salmon", "Лосось"),
    ("tuna", "Тунец"),
    ("shrimp", "Креветки"),
    ("cottage cheese", "Творог"),
    ("cream cheese", "Сливочный сыр"),
    ("cheese", "Сыр"),
    ("greek yogurt", "Греческий йогурт"),
    ("yogurt", "Йогурт"),
    ("yoghurt", "Йогурт"),
    ("whole milk", "Цельное молоко"),
    ("milk", "Молоко"),
    ("peanut butter", "Арахисовая паста"),
    ("butter", "Сливочное масло"),
    ("olive oil", "Оливковое масло"),
    ("egg white", "Яичный белок"),
    ("egg", "Яйцо"),
    ("brown rice", "Бурый рис"),
    ("rice", "Рис"),
    ("buckwheat", "Гречка"),
    ("oatmeal", "Овсянка"),
    ("oat", "Овсянка"),
    ("pasta", "Макароны"),
    ("whole wheat bread", "Цельнозерновой хлеб"),
    ("bread", "Хлеб"),
    ("potato", "Картофель"),
    ("banana", "Банан"),
    ("apple", "Яблоко"),
    ("orange", "Апельсин"),
    ("tomato", "Помидор"),
    ("cucumber", "Огурец"),
];

/// Cleans a provider-supplied product name into the canonical display form.
/// Pure; an empty result means the candidate carries no usable name.
pub fn normalize(raw: &str) -> String {
    let cleaned = clean(raw);
    if cleaned.is_empty() {
        return cleaned;
    }

    if contains_cyrillic(&cleaned) {
        return capitalize_first(&cleaned);
    }

    let lower = cleaned.to_lowercase();
    for (keyword, canonical) in KEYWORD_TABLE {
        if lower.contains(keyword) {
            return (*canonical).to_string();
        }
    }

    cleaned
}

/// Case-folded form used as a cache/deduplication key.
pub fn fold(query: &str) -> String {
    query.trim().to_lowercase()
}

fn clean(raw: &str) -> String {
    lazy_static! {
        static ref WS_RE: Regex = Regex::new(r"\s+").unwrap();
    }
    let unescaped = raw
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&amp;", "&");
    let collapsed = WS_RE.replace_all(&unescaped, " ");
    collapsed.trim().chars().take(MAX_NAME_CHARS).collect()
}

fn contains_cyrillic(s: &str) -> bool {
    s.chars().any(|c| ('\u{0400}'..='\u{04FF}').contains(&c))
}

fn capitalize_first(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
