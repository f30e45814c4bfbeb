use async_trait::async_trait;

use super::{Context, Page};

/// `/`: sends the visitor on to the dashboard or the login page.
#[derive(Debug, Default, Clone, Copy)]
pub struct RootPage;

#[async_trait]
impl Page for RootPage {
    fn render(&self) -> askama::Result<String> {
        Ok(String::new())
    }

    async fn mount(&mut self, ctx: &mut Context<'_>) {
        if ctx.store.is_logged_in() {
            ctx.navigate("/dashboard");
        } else {
            ctx.navigate("/login");
        }
    }
}
