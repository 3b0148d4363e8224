use crate::models::RecipeTable;

/// Normalize a search query the same way ingredient tokens are written.
#[must_use]
pub fn normalize_query(query: &str) -> String {
    query.trim().to_lowercase().replace(' ', "_")
}

/// Find recipes whose name or ingredients contain `query`.
///
/// Returns recipe ids in table order; an empty query matches everything.
#[must_use]
pub fn search_recipes(table: &RecipeTable, query: &str) -> Vec<usize> {
    let needle = normalize_query(query);
    if needle.is_empty() {
        return table.recipes.iter().map(|r| r.id).collect();
    }

    table
        .recipes
        .iter()
        .filter(|r| {
            let name = r.name.to_lowercase();
            name.contains(&needle)
                || name.replace(' ', "_").contains(&needle)
                || r.ingredients_text.contains(&needle)
        })
        .map(|r| r.id)
        .collect()
}

/// Order ids so the selected ones come first, keeping table order within each group.
#[must_use]
pub fn selected_first(ids: &[usize], is_selected: impl Fn(usize) -> bool) -> Vec<usize> {
    let (mut selected, rest): (Vec<usize>, Vec<usize>) =
        ids.iter().copied().partition(|&id| is_selected(id));
    selected.extend(rest);
    selected
}
