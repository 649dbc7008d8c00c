//! Column selection with explicit output positions.

use std::collections::HashSet;

use polars::prelude::DataFrame;

use crate::error::SelectColumnsError;

/// One selected column and its 1-based output position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpecColumnChoice {
    pub name: String,
    pub position: usize,
}

impl SpecColumnChoice {
    pub fn new(name: impl Into<String>, position: usize) -> Self {
        Self {
            name: name.into(),
            position,
        }
    }
}

/// Keep only the chosen columns of `df`, ordered by ascending position.
///
/// Ties keep the order of `choices`.
pub fn select_ordered_columns(
    df: &DataFrame,
    choices: &[SpecColumnChoice],
) -> Result<DataFrame, SelectColumnsError> {
    if choices.is_empty() {
        return Err(SelectColumnsError::EmptySelection);
    }

    let set_available: HashSet<&str> = df.get_column_names_str().into_iter().collect();
    let mut set_chosen: HashSet<&str> = HashSet::with_capacity(choices.len());
    for choice in choices {
        if choice.position == 0 {
            return Err(SelectColumnsError::InvalidPosition(choice.name.clone()));
        }
        if !set_available.contains(choice.name.as_str()) {
            return Err(SelectColumnsError::UnknownColumn {
                name: choice.name.clone(),
                available: df
                    .get_column_names_str()
                    .into_iter()
                    .map(ToString::to_string)
                    .collect(),
            });
        }
        if !set_chosen.insert(choice.name.as_str()) {
            return Err(SelectColumnsError::DuplicateColumn(choice.name.clone()));
        }
    }

    let mut l_ordered: Vec<&SpecColumnChoice> = choices.iter().collect();
    l_ordered.sort_by_key(|choice| choice.position);
    let l_names: Vec<&str> = l_ordered.iter().map(|choice| choice.name.as_str()).collect();
    log::debug!("Selected columns in order: {l_names:?}");

    Ok(df.select(l_names)?)
}

/// Positions `1..=n` in list order.
pub fn derive_default_choices(l_names: &[String]) -> Vec<SpecColumnChoice> {
    l_names
        .iter()
        .enumerate()
        .map(|(n_idx, name)| SpecColumnChoice::new(name.clone(), n_idx + 1))
        .collect()
}

/// Parse `"C=1,A=2"`; a bare `NAME` takes its 1-based place in the list.
pub fn parse_column_choices(text: &str) -> Result<Vec<SpecColumnChoice>, SelectColumnsError> {
    let mut l_choices = Vec::new();
    for (n_idx, item) in text.split(',').map(str::trim).enumerate() {
        if item.is_empty() {
            return Err(SelectColumnsError::InvalidChoice(text.to_string()));
        }
        let choice = match item.rsplit_once('=') {
            Some((name, position)) => {
                let position = position
                    .trim()
                    .parse::<usize>()
                    .map_err(|_| SelectColumnsError::InvalidChoice(item.to_string()))?;
                SpecColumnChoice::new(name.trim(), position)
            }
            None => SpecColumnChoice::new(item, n_idx + 1),
        };
        l_choices.push(choice);
    }
    Ok(l_choices)
}

#[cfg(test)]
mod tests {
    use polars::prelude::{Column, DataFrame};

    use super::{
        SpecColumnChoice, derive_default_choices, parse_column_choices, select_ordered_columns,
    };
    use crate::error::SelectColumnsError;

    fn sample_df() -> DataFrame {
        DataFrame::new(vec![
            Column::new("A".into(), vec![1i64, 2]),
            Column::new("B".into(), vec!["x", "y"]),
            Column::new("C".into(), vec![0.5f64, 1.5]),
        ])
        .expect("df")
    }

    #[test]
    fn positions_decide_order_not_list_order() {
        let df = sample_df();
        for choices in [
            vec![SpecColumnChoice::new("C", 1), SpecColumnChoice::new("A", 2)],
            vec![SpecColumnChoice::new("A", 2), SpecColumnChoice::new("C", 1)],
        ] {
            let out = select_ordered_columns(&df, &choices).expect("select");
            assert_eq!(out.get_column_names_str(), vec!["C", "A"]);
            assert_eq!(out.height(), 2);
        }
    }

    #[test]
    fn ties_keep_selection_order() {
        let choices = vec![
            SpecColumnChoice::new("B", 1),
            SpecColumnChoice::new("A", 1),
            SpecColumnChoice::new("C", 5),
        ];
        let out = select_ordered_columns(&sample_df(), &choices).expect("select");
        assert_eq!(out.get_column_names_str(), vec!["B", "A", "C"]);
    }

    #[test]
    fn invalid_selections_are_rejected() {
        let df = sample_df();
        assert!(matches!(
            select_ordered_columns(&df, &[]),
            Err(SelectColumnsError::EmptySelection)
        ));
        assert!(matches!(
            select_ordered_columns(&df, &[SpecColumnChoice::new("Z", 1)]),
            Err(SelectColumnsError::UnknownColumn { .. })
        ));
        assert!(matches!(
            select_ordered_columns(
                &df,
                &[SpecColumnChoice::new("A", 1), SpecColumnChoice::new("A", 2)]
            ),
            Err(SelectColumnsError::DuplicateColumn(_))
        ));
        assert!(matches!(
            select_ordered_columns(&df, &[SpecColumnChoice::new("A", 0)]),
            Err(SelectColumnsError::InvalidPosition(_))
        ));
    }

    #[test]
    fn default_choices_follow_list_order() {
        let l_names = vec!["A".to_string(), "B".to_string()];
        assert_eq!(
            derive_default_choices(&l_names),
            vec![SpecColumnChoice::new("A", 1), SpecColumnChoice::new("B", 2)]
        );
    }

    #[test]
    fn choice_text_is_parsed() {
        assert_eq!(
            parse_column_choices("C=1, A=2").expect("parse"),
            vec![SpecColumnChoice::new("C", 1), SpecColumnChoice::new("A", 2)]
        );
        assert_eq!(
            parse_column_choices("C,A").expect("parse"),
            vec![SpecColumnChoice::new("C", 1), SpecColumnChoice::new("A", 2)]
        );
        assert!(parse_column_choices("C=x").is_err());
        assert!(parse_column_choices("C,,A").is_err());
    }
}
