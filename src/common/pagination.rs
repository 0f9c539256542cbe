use serde::Deserialize;
use utoipa::IntoParams;
use validator::Validate;

pub const DEFAULT_PAGE_SIZE: i64 = 10;
pub const MAX_PAGE_SIZE: i64 = 100;

#[derive(Debug, Default, Deserialize, Validate, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct PaginationQuery {
    /// Zero-based page index
    #[validate(range(min = 0, message = "Invalid page parameter"))]
    pub page: Option<i64>,
    /// Page size, 1 to 100
    #[validate(range(min = 1, max = 100, message = "Invalid size parameter"))]
    pub size: Option<i64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub page: usize,
    pub size: usize,
}

impl Page {
    /// Link to the previous page, if there is one.
    pub fn prev_link(&self, path: &str) -> Option<String> {
        (self.page > 0).then(|| format!("{path}?page={}&size={}", self.page - 1, self.size))
    }

    /// Link to the next page. A full page implies there may be more.
    pub fn next_link(&self, path: &str, returned: usize) -> Option<String> {
        (returned == self.size).then(|| format!("{path}?page={}&size={}", self.page + 1, self.size))
    }
}

impl PaginationQuery {
    pub fn into_page(self) -> Result<Page, String> {
        self.validate().map_err(|errors| {
            errors
                .field_errors()
                .values()
                .flat_map(|errs| errs.iter())
                .filter_map(|e| e.message.as_ref().map(|m| m.to_string()))
                .next()
                .unwrap_or_else(|| "Invalid pagination parameters".to_string())
        })?;

        Ok(Page {
            page: self.page.unwrap_or(0) as usize,
            size: self.size.unwrap_or(DEFAULT_PAGE_SIZE) as usize,
        })
    }
}
