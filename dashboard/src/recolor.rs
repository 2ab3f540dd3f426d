use choropleth_shared::{Color, DataPoint, DataRecord, Feature, GeometryPayload};

use crate::config::Palette;
use crate::scale::{ColorScale, Scale};

pub const MISSING_LABEL: &str = "manquant";
pub const INFO_PLACEHOLDER: &str = "Déplacez la souris sur les DPS/ZS.";

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LegendKind {
    Range { from: f64, to: f64 },
    Missing,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LegendEntry {
    pub color: Color,
    pub kind: LegendKind,
    pub label: String,
}

/// Fill of one feature. Absent entries and flagged points never reach the scale.
pub fn fill_for(point: Option<&DataPoint>, scale: &ColorScale, palette: &Palette) -> Color {
    let Some(point) = point else {
        return palette.missing;
    };
    if point.is_not_expected {
        return palette.not_expected;
    }
    if point.is_missing {
        return palette.missing;
    }
    let Some(value) = point.value else {
        return palette.missing;
    };

    match scale.color_for(value) {
        Some(color) => color,
        None if scale.available_colors().len() == 1 => {
            palette.colors.first().copied().unwrap_or(palette.missing)
        }
        None => palette.missing,
    }
}

/// Fills for every feature of the active layer, in layer order.
pub fn paint_layer(
    features: &GeometryPayload,
    record: &DataRecord,
    scale: &ColorScale,
    palette: &Palette,
) -> Vec<(String, Color)> {
    features
        .slugs()
        .map(|slug| {
            (
                slug.to_string(),
                fill_for(record.get(slug), scale, palette),
            )
        })
        .collect()
}

fn clean_num(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

/// One range entry per palette color the scale can bound, then the fixed "missing" entry.
pub fn build_legend(scale: &ColorScale, palette: &Palette) -> Vec<LegendEntry> {
    let mut entries: Vec<LegendEntry> = palette
        .colors
        .iter()
        .enumerate()
        .filter_map(|(index, color)| {
            let (low, high) = scale.bounds_for(*color)?;
            if !low.is_finite() || !high.is_finite() {
                return None;
            }
            let from = if index == 0 { low } else { low + 0.1 };
            let (from, to) = (clean_num(from), clean_num(high));
            Some(LegendEntry {
                color: *color,
                kind: LegendKind::Range { from, to },
                label: format!("{from} – {to}"),
            })
        })
        .collect();

    entries.push(LegendEntry {
        color: palette.missing,
        kind: LegendKind::Missing,
        label: MISSING_LABEL.to_string(),
    });
    entries
}

/// `short_name`, or `short_name : human` when the record has an entry for `slug`.
/// `slug` is the feature's key in the layer, the same key `paint_layer` colors by.
pub fn info_text(slug: &str, feature: &Feature, record: Option<&DataRecord>) -> String {
    let name = &feature.properties.short_name;
    match record.and_then(|record| record.get(slug)) {
        Some(point) => format!("{name} : {}", point.human),
        None => name.clone(),
    }
}
