//! Terminal rendering of API outcomes.
//!
//! Every function writes to any `io::Write` and never talks to the client,
//! so rendering is tested on plain byte buffers.

use std::io::{self, Write};

use pricewatch_core::types::{IntelligentSearch, Recommendations, WatchlistReceipt};
use pricewatch_core::{
    best_deals, best_price, ApiError, Comparison, Health, Pager, Product, SearchResults,
    StoreDirectory,
};

const STORE_PREVIEW: usize = 3;

/// User-facing line for a failed action, e.g. `Search failed: ...`.
pub fn failure_message(action: &str, err: &ApiError) -> String {
    match err {
        ApiError::HttpError { body, .. } => match service_error(body) {
            Some(detail) => format!("{action} failed: {err} ({detail})"),
            None => format!("{action} failed: {err}"),
        },
        _ => format!("{action} failed: {err}"),
    }
}

/// The service's `{"error": "..."}` text, if the body carries one.
fn service_error(body: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(body).ok()?;
    value.get("error")?.as_str().map(str::to_string)
}

/// Indian digit grouping with up to three decimals: `1234567.5` → `12,34,567.5`.
pub fn format_inr(price: f64) -> String {
    let negative = price < 0.0;
    let thousandths = (price.abs() * 1000.0).round() as u64;
    let whole = (thousandths / 1000).to_string();
    let fraction = thousandths % 1000;

    let grouped = if whole.len() <= 3 {
        whole
    } else {
        let (head, tail) = whole.split_at(whole.len() - 3);
        let mut groups: Vec<&str> = Vec::new();
        let mut end = head.len();
        while end > 2 {
            groups.push(&head[end - 2..end]);
            end -= 2;
        }
        groups.push(&head[..end]);
        groups.reverse();
        format!("{},{tail}", groups.join(","))
    };

    let mut out = String::new();
    if negative {
        out.push('-');
    }
    out.push_str(&grouped);
    if fraction != 0 {
        let digits = format!("{fraction:03}");
        out.push('.');
        out.push_str(digits.trim_end_matches('0'));
    }
    out
}

/// Five-slot star bar: full, half, then empty stars.
pub fn stars(rating: Option<f64>) -> String {
    let rating = match rating {
        Some(r) if r > 0.0 => r.min(5.0),
        _ => return "No rating".to_string(),
    };
    let full = rating.floor() as usize;
    let half = usize::from(rating.fract() != 0.0);
    let empty = 5 - full - half;
    format!("{}{}{}", "★".repeat(full), "½".repeat(half), "☆".repeat(empty))
}

fn clock_time(timestamp: &str) -> Option<&str> {
    let (_, time) = timestamp.split_once('T')?;
    time.get(..8)
}

fn product_card(out: &mut impl Write, product: &Product, best: bool) -> io::Result<()> {
    let marker = if best { "[BEST DEAL] " } else { "" };
    writeln!(out, "  {marker}{} | {}", product.name, product.store)?;
    let rating = product
        .rating
        .map_or_else(|| "No rating".to_string(), |r| r.to_string());
    writeln!(
        out,
        "    ₹{}  {} {rating}",
        format_inr(product.price),
        stars(product.rating)
    )?;
    if !product.url.is_empty() {
        writeln!(out, "    {}", product.url)?;
    }
    Ok(())
}

pub fn render_search(
    out: &mut impl Write,
    query: &str,
    results: &SearchResults,
    pager: &Pager,
) -> io::Result<()> {
    writeln!(out, "Results for \"{query}\"")?;
    writeln!(out, "{} products found", results.total_results)?;
    if let Some(time) = results.search_time.as_deref().and_then(clock_time) {
        writeln!(out, "Search completed at {time}")?;
    }

    let products = &results.results;
    if products.is_empty() {
        writeln!(out)?;
        writeln!(out, "No products found")?;
        writeln!(out, "Try different keywords or adjust your filters")?;
        return Ok(());
    }

    if let Some(best) = best_price(products) {
        let count = best_deals(products).len();
        writeln!(
            out,
            "Best deal: ₹{} at {count} listing(s)",
            format_inr(best)
        )?;
    }
    writeln!(out)?;

    let best = best_price(products);
    for product in pager.visible(products) {
        product_card(out, product, Some(product.price) == best)?;
    }

    if pager.has_more(products.len()) {
        writeln!(out)?;
        writeln!(
            out,
            "Showing {} of {}. Pass --pages {} to load more.",
            pager.shown(products.len()),
            products.len(),
            pager.page() + 1
        )?;
    }
    Ok(())
}

pub fn render_comparison(out: &mut impl Write, comparison: &Comparison) -> io::Result<()> {
    writeln!(out, "Price Comparison: {}", comparison.query)?;
    writeln!(out, "Best Price: ₹{}", format_inr(comparison.best_price))?;
    writeln!(
        out,
        "{} store(s) offering this price",
        comparison.best_deals.len()
    )?;
    for (store, products) in &comparison.comparison {
        writeln!(out)?;
        writeln!(out, "{store}")?;
        for product in products.iter().take(STORE_PREVIEW) {
            let rating = product.rating.map_or_else(String::new, |r| format!("{r}★"));
            writeln!(
                out,
                "  ₹{}  {rating}  {}",
                format_inr(product.price),
                product.url
            )?;
        }
    }
    Ok(())
}

pub fn render_stores(out: &mut impl Write, directory: &StoreDirectory) -> io::Result<()> {
    writeln!(out, "{} store(s)", directory.total)?;
    for (key, store) in &directory.stores {
        writeln!(out, "  {key:<12} {:<12} {}", store.name, store.status)?;
    }
    Ok(())
}

pub fn render_health(out: &mut impl Write, health: &Health) -> io::Result<()> {
    write!(out, "API status: {}", health.status)?;
    if let Some(scrapers) = health.scrapers {
        write!(out, " ({scrapers} scrapers)")?;
    }
    writeln!(out)
}

pub fn render_insights(out: &mut impl Write, insights: &IntelligentSearch) -> io::Result<()> {
    writeln!(out, "AI Shopping Assistant")?;
    writeln!(out, "Understanding your needs:")?;
    let intent = insights
        .intent_analysis
        .analysis
        .as_deref()
        .unwrap_or("Analyzing your search...");
    writeln!(out, "  {intent}")?;

    writeln!(out, "Personalized Advice")?;
    for line in insights.personalized_advice.lines().filter(|l| !l.trim().is_empty()) {
        writeln!(out, "  {line}")?;
    }

    if let Some(analysis) = insights.ai_analysis.analysis.as_deref() {
        writeln!(out, "Deal Analysis")?;
        writeln!(out, "  {analysis}")?;
    }

    if !insights.results.is_empty() {
        writeln!(out)?;
        let best = best_price(&insights.results);
        for product in insights.results.iter().take(5) {
            product_card(out, product, Some(product.price) == best)?;
        }
    }
    Ok(())
}

pub fn render_watchlist(out: &mut impl Write, receipt: &WatchlistReceipt) -> io::Result<()> {
    writeln!(out, "Added to watchlist! {}", receipt.message)?;
    if let Some(id) = &receipt.watchlist_id {
        writeln!(out, "Watchlist id: {id}")?;
    }
    Ok(())
}

pub fn render_recommendations(out: &mut impl Write, recs: &Recommendations) -> io::Result<()> {
    writeln!(out, "AI Recommendations")?;
    if !recs.reasoning.is_empty() {
        writeln!(out, "Why we recommend these:")?;
        writeln!(out, "  {}", recs.reasoning)?;
    }
    if recs.recommendations.is_empty() {
        writeln!(out, "No recommendations right now")?;
        return Ok(());
    }
    writeln!(out)?;
    for product in &recs.recommendations {
        product_card(out, product, false)?;
    }
    Ok(())
}
