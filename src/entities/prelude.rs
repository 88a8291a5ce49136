pub use super::search_pagination::Entity as SearchPagination;
pub use super::search_results::Entity as SearchResults;
