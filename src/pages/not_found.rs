use askama::Template;
use async_trait::async_trait;

use super::Page;

#[derive(Template)]
#[template(path = "not_found.html")]
struct NotFoundTemplate;

/// `/404`, and anything no other route claims.
#[derive(Debug, Default, Clone, Copy)]
pub struct NotFoundPage;

#[async_trait]
impl Page for NotFoundPage {
    fn render(&self) -> askama::Result<String> {
        NotFoundTemplate.render()
    }
}
