use std::collections::HashSet;

use super::product::FoodProduct;

/// Local results first, in order, then every remote result whose barcode
/// is not already present locally. Products without a barcode are always kept.
pub fn merge_search_results(
    local: Vec<FoodProduct>,
    remote: Vec<FoodProduct>,
) -> Vec<FoodProduct> {
    let local_barcodes: HashSet<String> = local
        .iter()
        .filter_map(|p| p.barcode_key().map(str::to_string))
        .collect();

    let mut merged = local;
    merged.extend(remote.into_iter().filter(|p| match p.barcode_key() {
        Some(code) => !local_barcodes.contains(code),
        None => true,
    }));
    merged
}
