pub(crate) mod architect;
pub(crate) mod assignments;
pub(crate) mod auth;
pub(crate) mod challenge;
pub(crate) mod errors;
pub(crate) mod guards;
pub(crate) mod handlers;
pub(crate) mod pagination;
pub(crate) mod reports;
pub(crate) mod resources;
pub(crate) mod router;
pub(crate) mod submissions;
pub(crate) mod validation;
