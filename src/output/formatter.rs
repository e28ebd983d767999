use owo_colors::OwoColorize;
use std::io::IsTerminal;

use crate::cache::{CachedProperty, CitySearch};
use crate::catalog::House;
use crate::scoring::ScoreBreakdown;

/// Check if stdout is a TTY (for auto-detecting color support)
pub fn should_use_colors() -> bool {
    std::io::stdout().is_terminal()
}

/// Format a score breakdown as one line per rubric category plus a total.
pub fn format_breakdown(breakdown: &ScoreBreakdown, use_colors: bool) -> String {
    let mut lines = Vec::with_capacity(breakdown.categories.len() + 1);
    for (category, contribution) in breakdown.entries() {
        // Pad before colorizing so the escape codes don't eat the column.
        let padded = format!("{:<18}", category);
        if use_colors {
            lines.push(format!("  {} {}", padded.cyan(), contribution));
        } else {
            lines.push(format!("  {} {}", padded, contribution));
        }
    }
    let total = if use_colors {
        format!("Total: {}", format!("{:+}", breakdown.total).bold())
    } else {
        format!("Total: {:+}", breakdown.total)
    };
    lines.push(total);
    lines.join("\n")
}

/// Format a catalog listing as one line per house
/// Format: "#{id} [{score}] {address} -- {notes}"
pub fn format_house_list(houses: &[House], use_colors: bool) -> String {
    if houses.is_empty() {
        return "No houses in the catalog yet.".to_string();
    }
    houses
        .iter()
        .map(|h| format_house_line(h, use_colors))
        .collect::<Vec<_>>()
        .join("\n")
}

fn format_house_line(house: &House, use_colors: bool) -> String {
    let notes = house
        .notes
        .as_deref()
        .map(|n| format!(" -- {}", n))
        .unwrap_or_default();
    if use_colors {
        format!(
            "#{} [{}] {}{}",
            house.id,
            format!("{:+}", house.score).bold(),
            house.address.cyan(),
            notes
        )
    } else {
        format!("#{} [{:+}] {}{}", house.id, house.score, house.address, notes)
    }
}

/// Format a single house with its full breakdown (for `show`).
pub fn format_house_detail(house: &House, use_colors: bool) -> String {
    let mut out = format_house_line(house, use_colors);
    out.push('\n');
    out.push_str(&format_breakdown(&house.breakdown, use_colors));
    out
}

/// Format a cached property with the fields a buyer cares about.
pub fn format_property(prop: &CachedProperty, use_colors: bool) -> String {
    let price = prop
        .price
        .map(|p| format!("${}", group_thousands(p)))
        .unwrap_or_else(|| "price unknown".to_string());
    let header = if use_colors {
        format!("{} ({})", prop.address.bold(), price.green())
    } else {
        format!("{} ({})", prop.address, price)
    };

    let mut lines = vec![header];
    lines.push(format!(
        "  {} bed / {} bath, {} sqft, {} acre lot",
        prop.bedrooms, prop.bathrooms, prop.sqft, prop.lot_acres
    ));
    let mut extras = vec![format!("type: {}", prop.property_type)];
    if prop.garage_cars > 0 {
        extras.push(format!("{}-car garage", prop.garage_cars));
    }
    if let Some(year) = prop.year_built {
        extras.push(format!("built {}", year));
    }
    lines.push(format!("  {}", extras.join(", ")));
    if let Some(photo) = &prop.photo_url {
        lines.push(format!("  photo: {}", photo));
    }
    lines.push(format!(
        "  zip {}, cached {}",
        prop.zip_code,
        prop.last_updated.format("%Y-%m-%d")
    ));
    lines.join("\n")
}

/// Format a list of cached properties, one block each.
pub fn format_property_list(props: &[CachedProperty], use_colors: bool) -> String {
    if props.is_empty() {
        return "No matching properties.".to_string();
    }
    props
        .iter()
        .map(|p| format_property(p, use_colors))
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// Summary footer for a city-wide search: which ZIPs came from cache and
/// which needed the API.
pub fn format_city_summary(search: &CitySearch) -> String {
    let mut summary = format!(
        "{} properties across {} ZIP codes ({} from cache, {} from the listings API)",
        search.properties.len(),
        search.zips_searched.len(),
        search.cache_hit_zips.len(),
        search.api_zips.len()
    );
    if !search.failed_zips.is_empty() {
        summary.push_str(&format!(
            "; search failed for {}",
            search.failed_zips.join(", ")
        ));
    }
    summary
}

fn group_thousands(n: i64) -> String {
    let digits = n.abs().to_string();
    let mut grouped = String::new();
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(c);
    }
    if n < 0 {
        format!("-{}", grouped)
    } else {
        grouped
    }
}
