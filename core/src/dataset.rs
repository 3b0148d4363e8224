use std::collections::{BTreeSet, HashSet};
use std::io::Read;

use anyhow::{Context, Result, bail};
use tracing::{debug, info};

use crate::models::{
    INGREDIENT_COLUMN_PREFIX, IngredientTypeMap, ParsedDataset, RECIPE_NAME_COLUMN, RecipeRow,
    RecipeTable,
};

/// A recipe row after cleaning, before vectorization.
struct CleanRow {
    name: String,
    metadata: Vec<String>,
    /// One cleaned cell per ingredient category column.
    category_cells: Vec<String>,
}

/// Parse a recipe spreadsheet exported as CSV.
///
/// Expected header: a `Recipe Name` column, any number of
/// `Ingredients: <Category>` columns holding comma-separated ingredients, and
/// any number of other metadata columns which are carried through verbatim.
///
/// Missing cells count as empty. Rows without a recipe name are skipped.
pub fn parse_recipe_csv<R: Read>(reader: R) -> Result<ParsedDataset> {
    let mut rdr = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let headers = rdr.headers().context("Failed to read CSV headers")?.clone();

    let Some(idx_name) = headers.iter().position(|h| h == RECIPE_NAME_COLUMN) else {
        bail!("Missing required column: {RECIPE_NAME_COLUMN}");
    };

    let mut categories: Vec<(usize, String)> = Vec::new();
    let mut other_columns: Vec<(usize, String)> = Vec::new();
    for (idx, header) in headers.iter().enumerate() {
        if idx == idx_name {
            continue;
        }
        match header.strip_prefix(INGREDIENT_COLUMN_PREFIX) {
            Some(category) => categories.push((idx, category.trim().to_string())),
            None => other_columns.push((idx, header.to_string())),
        }
    }

    let mut rows: Vec<CleanRow> = Vec::new();
    let mut seen: HashSet<String> = HashSet::new();

    for (line_num, result) in rdr.records().enumerate() {
        let record = result.with_context(|| format!("Failed to parse CSV row {}", line_num + 2))?;
        let cell = |idx: usize| record.get(idx).unwrap_or("").to_string();

        let name = cell(idx_name);
        if name.is_empty() {
            continue; // skip blank rows
        }
        if !seen.insert(name.clone()) {
            bail!("Duplicate recipe name '{name}' on CSV row {}", line_num + 2);
        }

        rows.push(CleanRow {
            name,
            metadata: other_columns.iter().map(|(idx, _)| cell(*idx)).collect(),
            category_cells: categories
                .iter()
                .map(|(idx, _)| clean_ingredient_cell(record.get(*idx).unwrap_or("")))
                .collect(),
        });
    }

    let category_names: Vec<String> = categories.into_iter().map(|(_, name)| name).collect();
    let ingredient_types = build_ingredient_type_map(&category_names, &rows);

    let texts: Vec<String> = rows
        .iter()
        .map(|r| combine_ingredient_cells(&r.category_cells))
        .collect();

    let vocabulary: Vec<String> = texts
        .iter()
        .flat_map(|t| tokenize(t))
        .map(str::to_string)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();

    let recipes = rows
        .into_iter()
        .zip(texts)
        .enumerate()
        .map(|(id, (row, ingredients_text))| {
            let ingredient_counts = count_tokens(&vocabulary, &ingredients_text);
            RecipeRow {
                id,
                name: row.name,
                metadata: row.metadata,
                ingredients_text,
                ingredient_counts,
            }
        })
        .collect::<Vec<_>>();

    info!(
        recipes = recipes.len(),
        ingredients = vocabulary.len(),
        categories = category_names.len(),
        "Parsed recipe dataset"
    );

    Ok(ParsedDataset {
        table: RecipeTable {
            other_columns: other_columns.into_iter().map(|(_, name)| name).collect(),
            vocabulary,
            recipes,
        },
        ingredient_types,
    })
}

/// Normalize one ingredient list cell into comma-separated lowercase tokens.
///
/// `"Olive Oil, 2 Cloves Garlic"` becomes `"olive_oil,_cloves_garlic"`.
#[must_use]
pub fn clean_ingredient_cell(raw: &str) -> String {
    let spaced = raw.replace(' ', "_").replace(",_", ",");
    let letters: String = spaced
        .chars()
        .filter(|c| c.is_ascii_alphabetic() || *c == ',' || *c == '_')
        .collect();
    collapse_runs(&letters, '_').trim().to_lowercase()
}

/// Join the cleaned category cells of one recipe into its ingredient text.
#[must_use]
pub fn combine_ingredient_cells(cells: &[String]) -> String {
    let joined: String = cells.iter().map(|c| format!("{c},")).collect();
    let joined = joined.replace(",_", ",");
    let joined = collapse_runs(&collapse_runs(&joined, ' '), ',');
    joined.trim().trim_matches(',').to_string()
}

/// Split ingredient text into word tokens (ASCII alphanumerics and `_`).
pub fn tokenize(text: &str) -> impl Iterator<Item = &str> {
    text.split(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
        .filter(|token| !token.is_empty())
}

fn count_tokens(vocabulary: &[String], text: &str) -> Vec<u32> {
    let mut counts = vec![0; vocabulary.len()];
    for token in tokenize(text) {
        if let Ok(idx) = vocabulary.binary_search_by(|t| t.as_str().cmp(token)) {
            counts[idx] += 1;
        }
    }
    counts
}

/// Map each token to the last category column it appears under.
///
/// Columns are visited left to right and rows top to bottom, so a later column
/// overrides an earlier one regardless of which row mentions the token.
fn build_ingredient_type_map(categories: &[String], rows: &[CleanRow]) -> IngredientTypeMap {
    let mut map = IngredientTypeMap::new();
    for (col, category) in categories.iter().enumerate() {
        for row in rows {
            for token in row.category_cells[col].split(',').filter(|t| !t.is_empty()) {
                if let Some(previous) = map.insert(token.to_string(), category.clone()) {
                    if previous != *category {
                        debug!(token, from = %previous, to = %category, "Ingredient category overridden");
                    }
                }
            }
        }
    }
    map
}

fn collapse_runs(s: &str, ch: char) -> String {
    let mut out = String::with_capacity(s.len());
    let mut last_was = false;
    for c in s.chars() {
        if c == ch {
            if !last_was {
                out.push(c);
            }
            last_was = true;
        } else {
            out.push(c);
            last_was = false;
        }
    }
    out
}
