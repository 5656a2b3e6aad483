//! Filter, sort and pagination options for list requests.

use serde::Deserialize;

use crate::resources::OwnedResource;
use crate::validation::ValidationErrors;

/// Raw query-string parameters, before interpretation.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListParams {
    pub completed: Option<String>,
    #[serde(rename = "sortBy")]
    pub sort_by: Option<String>,
    pub limit: Option<String>,
    pub skip: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    Asc,
    Desc,
}

impl SortOrder {
    pub fn as_sql(&self) -> &'static str {
        match self {
            Self::Asc => "ASC",
            Self::Desc => "DESC",
        }
    }
}

/// Interpreted list options. `None` everywhere means "no bound".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListQuery {
    pub completed: Option<bool>,
    /// Stored column and direction
    pub sort: Option<(&'static str, SortOrder)>,
    pub limit: Option<u32>,
    pub skip: Option<u32>,
}

impl ListQuery {
    /// Interpret `params` for resource `R`.
    ///
    /// `completed` filters on `== "true"`. `sortBy` is `field:asc|desc`; the
    /// field must be sortable for `R`, any direction other than `desc` sorts
    /// ascending. A `limit` of zero means unlimited.
    pub fn parse<R: OwnedResource>(params: &ListParams) -> Result<Self, ValidationErrors> {
        let mut errors = ValidationErrors::new().with_message("Invalid query");
        let mut query = ListQuery {
            completed: params.completed.as_deref().map(|value| value == "true"),
            ..Default::default()
        };

        if let Some(sort_by) = params.sort_by.as_deref().filter(|s| !s.is_empty()) {
            let (field, direction) = sort_by.split_once(':').unwrap_or((sort_by, "asc"));
            let order = if direction == "desc" {
                SortOrder::Desc
            } else {
                SortOrder::Asc
            };
            match R::SORTABLE.iter().find(|(name, _)| *name == field) {
                Some((_, column)) => query.sort = Some((*column, order)),
                None => errors.add("sortBy", format!("cannot sort by '{}'", field)),
            }
        }

        match parse_count(params.limit.as_deref()) {
            Ok(limit) => query.limit = limit.filter(|n| *n > 0),
            Err(()) => errors.add("limit", "must be a non-negative integer"),
        }
        match parse_count(params.skip.as_deref()) {
            Ok(skip) => query.skip = skip,
            Err(()) => errors.add("skip", "must be a non-negative integer"),
        }

        errors.into_result().map(|_| query)
    }
}

fn parse_count(raw: Option<&str>) -> Result<Option<u32>, ()> {
    match raw.map(str::trim) {
        None | Some("") => Ok(None),
        Some(value) => value.parse::<u32>().map(Some).map_err(|_| ()),
    }
}
