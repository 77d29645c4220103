//! Keyword, emoji and stop-word tables shared by every validator
//!
//! Terms are lowercase; matching lowercases the content first.

pub const FINANCE_KEYWORDS: &[&str] = &[
    "stock",
    "price",
    "volume",
    "market",
    "trading",
    "bullish",
    "bearish",
    "shares",
    "earnings",
    "dividend",
    "exchange",
    "portfolio",
    "support",
    "resistance",
    "etf",
    "index",
    "nasdaq",
    "nyse",
    "s&p",
    // common tickers
    "nvda",
    "spy",
    "gme",
    "aapl",
    "msft",
    "tsla",
    "amzn",
    "googl",
    "qqq",
];

/// Emoji the chat backend uses to flag financial content.
///
/// Symbols that are usually followed by a variation selector are stored without it.
pub const FINANCIAL_EMOJIS: &[&str] = &[
    "📈", "📉", "💰", "💵", "💸", "💹", "📊", "🚀", "🎯", "🟢", "🔴", "🏦", "⚡", "🔥", "⚠", "🐂",
    "🐻", "💎",
];

/// Uppercase words that look like tickers but are not.
pub const TICKER_STOP_WORDS: &[&str] = &[
    "THE", "AND", "FOR", "ARE", "BUT", "NOT", "YOU", "ALL", "ANY", "CAN", "HAD", "HER", "WAS",
    "ONE", "OUR", "OUT", "HAS", "HIS", "HOW", "NEW", "NOW", "OLD", "SEE", "TWO", "WHO", "ITS",
    "MAY", "DAY", "GET", "USE", "WITH", "THIS", "THAT", "FROM", "HAVE", "WILL", "YOUR", "WHAT",
    "WHEN", "THEY", "BEEN", "INTO", "THAN", "THEN", "SOME", "ONLY", "ALSO", "JUST", "OVER",
    "MORE", "MOST", "HIGH", "LOW", "NOTE", "IS", "IT", "IN", "ON", "AT", "TO", "OF", "OR", "IF",
    "AS", "AN", "BE", "BY", "DO", "GO", "NO", "SO", "UP", "US", "WE", "MY", "ME", "HE", "OK",
    "AI", "AM", "PM", "ET", "EST", "EDT", "UTC", "USD", "CEO", "CFO", "IPO", "ETF", "RSI",
    "MACD", "SMA", "EMA", "ATH", "YTD", "EPS", "FAQ", "GPU", "CPU",
];

pub const MARKET_STATUS_TERMS: &[&str] = &[
    "market status",
    "market is open",
    "market is closed",
    "market open",
    "market closed",
    "markets are",
    "trading session",
    "trading hours",
    "pre-market",
    "after-hours",
    "nyse",
    "nasdaq",
];

pub const EXCHANGE_TERMS: &[&str] = &["nyse", "nasdaq", "exchange", "cboe"];

pub const TIME_TERMS: &[&str] = &[
    "today",
    "session",
    "hours",
    "am",
    "pm",
    "et",
    "est",
    "edt",
    "close",
    "opens",
];

pub const NVDA_TERMS: &[&str] = &["nvda", "nvidia"];

pub const SEMICONDUCTOR_TERMS: &[&str] = &[
    "gpu",
    "semiconductor",
    "chip",
    "data center",
    "ai",
    "artificial intelligence",
];

pub const SPY_TERMS: &[&str] = &["spy", "s&p 500", "s&p500", "spdr"];

pub const ETF_TERMS: &[&str] = &["etf", "fund", "index", "expense ratio", "holdings"];

pub const SECTOR_TERMS: &[&str] = &[
    "sector",
    "technology",
    "financials",
    "healthcare",
    "energy",
    "consumer",
    "industrials",
];

pub const GME_TERMS: &[&str] = &["gme", "gamestop"];

pub const VOLATILITY_TERMS: &[&str] = &[
    "volatility",
    "volatile",
    "short squeeze",
    "short interest",
    "meme",
    "retail",
];

pub const PRICE_TERMS: &[&str] = &["price", "$", "trading at", "closed at", "per share"];

pub const VOLUME_TERMS: &[&str] = &["volume", "shares traded", "liquidity"];

pub const SENTIMENT_TERMS: &[&str] = &[
    "bullish",
    "bearish",
    "neutral",
    "positive",
    "negative",
    "optimistic",
    "cautious",
];

pub const COMPARISON_TERMS: &[&str] = &[
    "compare",
    "comparison",
    "versus",
    "vs",
    "relative",
    "outperform",
    "underperform",
];

pub const SNAPSHOT_TERMS: &[&str] = &[
    "price",
    "volume",
    "market cap",
    "change",
    "open",
    "close",
    "high",
    "low",
    "52-week",
    "day range",
];

pub const PERCENT_TERMS: &[&str] = &["%", "percent"];

pub const SUPPORT_RESISTANCE_TERMS: &[&str] = &["support", "resistance"];

pub const PRICE_LEVEL_TERMS: &[&str] = &["$", "level", "zone", "target", "pivot"];

pub const TECHNICAL_TERMS: &[&str] = &[
    "rsi",
    "macd",
    "moving average",
    "sma",
    "ema",
    "bollinger",
    "stochastic",
    "momentum",
    "trend",
    "volume",
];

pub const SIGNAL_TERMS: &[&str] = &[
    "buy",
    "sell",
    "hold",
    "overbought",
    "oversold",
    "crossover",
    "breakout",
];

/// Whether `term` occurs in `haystack` as a word.
///
/// Terms starting with a letter or digit need a word boundary in front. Short terms
/// (three chars or fewer) also need one behind them, allowing a plural "s", so that
/// "ai" does not match "said" and "spy" does not match "spyware".
pub fn contains_term(haystack: &str, term: &str) -> bool {
    if term.is_empty() {
        return false;
    }

    let leading = term.chars().next().map_or(false, char::is_alphanumeric);
    let trailing = term.chars().next_back().map_or(false, char::is_alphanumeric)
        && term.chars().count() <= 3;

    haystack.match_indices(term).any(|(at, _)| {
        let before_ok = !leading || !is_word_char(haystack[..at].chars().next_back());
        let after_ok = !trailing || boundary_after(&haystack[at + term.len()..]);
        before_ok && after_ok
    })
}

/// Terms from `terms` found in `haystack`, in table order.
pub fn matched_terms<'a>(haystack: &str, terms: &[&'a str]) -> Vec<&'a str> {
    terms
        .iter()
        .copied()
        .filter(|term| contains_term(haystack, term))
        .collect()
}

fn boundary_after(rest: &str) -> bool {
    let mut chars = rest.chars();
    match chars.next() {
        None => true,
        Some('s') => !is_word_char(chars.next()),
        Some(c) => !c.is_alphanumeric(),
    }
}

fn is_word_char(c: Option<char>) -> bool {
    c.map_or(false, char::is_alphanumeric)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_terms_need_boundaries() {
        assert!(contains_term("nvda is an ai leader", "ai"));
        assert!(!contains_term("analysts said so", "ai"));
        assert!(!contains_term("spyware alert", "spy"));
        assert!(contains_term("two etfs compared", "etf"));
    }

    #[test]
    fn test_long_terms_match_inflections() {
        assert!(contains_term("stocks rallied", "stock"));
        assert!(!contains_term("livestock prices", "stock"));
        assert!(contains_term("the s&p 500 index", "s&p 500"));
    }

    #[test]
    fn test_symbol_terms_match_anywhere() {
        assert!(contains_term("up 3.2% today", "%"));
        assert!(contains_term("at $131.20", "$"));
    }

    #[test]
    fn test_tables_are_lowercase() {
        for table in [FINANCE_KEYWORDS, MARKET_STATUS_TERMS, TECHNICAL_TERMS, SNAPSHOT_TERMS] {
            for term in table {
                assert_eq!(*term, term.to_lowercase());
            }
        }
    }
}
