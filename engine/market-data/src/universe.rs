//! Default stock universe used for seeding and mock pricing

use rust_decimal::Decimal;

/// A seed entry: symbol, company name, sector, base price in cents
pub struct UniverseEntry {
    pub symbol: &'static str,
    pub company_name: &'static str,
    pub sector: &'static str,
    pub base_price_cents: i64,
}

/// The tradable universe the service is seeded with
pub const UNIVERSE: &[UniverseEntry] = &[
    UniverseEntry { symbol: "TSLA", company_name: "Tesla Inc.", sector: "Automotive", base_price_cents: 19375 },
    UniverseEntry { symbol: "AAPL", company_name: "Apple Inc.", sector: "Technology", base_price_cents: 17545 },
    UniverseEntry { symbol: "MSFT", company_name: "Microsoft Corp.", sector: "Technology", base_price_cents: 40215 },
    UniverseEntry { symbol: "AMZN", company_name: "Amazon.com Inc.", sector: "E-Commerce", base_price_cents: 17825 },
    UniverseEntry { symbol: "NVDA", company_name: "NVIDIA Corp.", sector: "Technology", base_price_cents: 87990 },
    UniverseEntry { symbol: "GOOGL", company_name: "Alphabet Inc.", sector: "Technology", base_price_cents: 16530 },
    UniverseEntry { symbol: "META", company_name: "Meta Platforms Inc.", sector: "Technology", base_price_cents: 47485 },
    UniverseEntry { symbol: "JPM", company_name: "JPMorgan Chase & Co.", sector: "Financial Services", base_price_cents: 19510 },
    UniverseEntry { symbol: "BRK.A", company_name: "Berkshire Hathaway Inc.", sector: "Conglomerate", base_price_cents: 60849500 },
    UniverseEntry { symbol: "V", company_name: "Visa Inc.", sector: "Financial Services", base_price_cents: 27565 },
    UniverseEntry { symbol: "JNJ", company_name: "Johnson & Johnson", sector: "Healthcare", base_price_cents: 15236 },
    UniverseEntry { symbol: "PFE", company_name: "Pfizer Inc.", sector: "Healthcare", base_price_cents: 2879 },
    UniverseEntry { symbol: "MRK", company_name: "Merck & Co.", sector: "Healthcare", base_price_cents: 13045 },
    UniverseEntry { symbol: "UNH", company_name: "UnitedHealth Group", sector: "Healthcare", base_price_cents: 52873 },
    UniverseEntry { symbol: "ABT", company_name: "Abbott Laboratories", sector: "Healthcare", base_price_cents: 10752 },
    UniverseEntry { symbol: "XOM", company_name: "Exxon Mobil Corp.", sector: "Energy", base_price_cents: 11988 },
    UniverseEntry { symbol: "CVX", company_name: "Chevron Corp.", sector: "Energy", base_price_cents: 15630 },
    UniverseEntry { symbol: "COP", company_name: "ConocoPhillips", sector: "Energy", base_price_cents: 11267 },
    UniverseEntry { symbol: "BP", company_name: "BP p.l.c.", sector: "Energy", base_price_cents: 3542 },
    UniverseEntry { symbol: "SLB", company_name: "Schlumberger Ltd.", sector: "Energy", base_price_cents: 4378 },
    UniverseEntry { symbol: "PG", company_name: "Procter & Gamble Co.", sector: "Consumer Goods", base_price_cents: 16689 },
    UniverseEntry { symbol: "KO", company_name: "Coca-Cola Co.", sector: "Consumer Goods", base_price_cents: 6315 },
    UniverseEntry { symbol: "PEP", company_name: "PepsiCo Inc.", sector: "Consumer Goods", base_price_cents: 17273 },
    UniverseEntry { symbol: "WMT", company_name: "Walmart Inc.", sector: "Consumer Goods", base_price_cents: 6035 },
    UniverseEntry { symbol: "COST", company_name: "Costco Wholesale Corp.", sector: "Consumer Goods", base_price_cents: 85597 },
    UniverseEntry { symbol: "VZ", company_name: "Verizon Communications", sector: "Telecommunications", base_price_cents: 4078 },
    UniverseEntry { symbol: "T", company_name: "AT&T Inc.", sector: "Telecommunications", base_price_cents: 1725 },
    UniverseEntry { symbol: "TMUS", company_name: "T-Mobile US Inc.", sector: "Telecommunications", base_price_cents: 16235 },
    UniverseEntry { symbol: "VOD", company_name: "Vodafone Group Plc", sector: "Telecommunications", base_price_cents: 892 },
    UniverseEntry { symbol: "ERIC", company_name: "Ericsson", sector: "Telecommunications", base_price_cents: 547 },
    UniverseEntry { symbol: "GE", company_name: "General Electric Co.", sector: "Manufacturing", base_price_cents: 16023 },
    UniverseEntry { symbol: "MMM", company_name: "3M Co.", sector: "Manufacturing", base_price_cents: 9756 },
    UniverseEntry { symbol: "CAT", company_name: "Caterpillar Inc.", sector: "Manufacturing", base_price_cents: 34568 },
    UniverseEntry { symbol: "DE", company_name: "Deere & Co.", sector: "Manufacturing", base_price_cents: 39425 },
    UniverseEntry { symbol: "BA", company_name: "Boeing Co.", sector: "Manufacturing", base_price_cents: 18235 },
];

/// Look up a universe entry by symbol
pub fn lookup(symbol: &str) -> Option<&'static UniverseEntry> {
    UNIVERSE.iter().find(|e| e.symbol == symbol)
}

/// Company name for a symbol, falling back to "<SYMBOL> Inc."
pub fn company_name(symbol: &str) -> String {
    lookup(symbol).map(|e| e.company_name.to_string()).unwrap_or_else(|| format!("{symbol} Inc."))
}

/// Base price for a symbol in dollars
pub fn base_price(symbol: &str) -> Option<Decimal> {
    lookup(symbol).map(|e| Decimal::new(e.base_price_cents, 2))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_known_symbol() {
        let entry = lookup("TSLA").unwrap();
        assert_eq!(entry.company_name, "Tesla Inc.");
        assert_eq!(entry.sector, "Automotive");
    }

    #[test]
    fn test_company_name_fallback() {
        assert_eq!(company_name("ZZZZ"), "ZZZZ Inc.");
    }

    #[test]
    fn test_base_price() {
        assert_eq!(base_price("TSLA"), Some(Decimal::new(19375, 2)));
        assert_eq!(base_price("ZZZZ"), None);
    }
}
