// src/news/catalog.rs
//! Fixed text used by the mock generator.

/// Headline templates; `{}` is replaced by the symbol.
pub const HEADLINE_TEMPLATES: [&str; 10] = [
    "{} reports strong quarterly earnings",
    "{} announces new strategic partnership",
    "{} stock price target revised by analysts",
    "{} declares dividend for shareholders",
    "{} expands operations in new markets",
    "{} board approves major acquisition",
    "{} launches innovative product line",
    "{} receives regulatory approval",
    "{} signs multi-billion dollar contract",
    "{} announces management changes",
];

pub const PUBLISHERS: [&str; 5] = [
    "Economic Times",
    "Business Standard",
    "Moneycontrol",
    "Reuters",
    "Bloomberg",
];

pub fn headline(template_idx: usize, symbol: &str) -> String {
    HEADLINE_TEMPLATES[template_idx % HEADLINE_TEMPLATES.len()].replace("{}", symbol)
}

pub fn summary(symbol: &str) -> String {
    format!(
        "Latest developments and analysis regarding {symbol} stock performance and business operations."
    )
}

pub fn article_url(symbol: &str, seq: usize) -> String {
    format!("https://example.com/news/{}-{seq}", symbol.to_lowercase())
}
