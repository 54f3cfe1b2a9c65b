//! Landing page route handler.

use askama::Template;
use askama_web::WebTemplate;
use axum::response::IntoResponse;
use tower_sessions::Session;
use tracing::instrument;

use crate::filters;
use crate::models::{Flash, session::take_flash};

/// A selling point shown under the hero.
#[derive(Clone)]
pub struct Highlight {
    pub title: &'static str,
    pub body: &'static str,
}

const HIGHLIGHTS: [Highlight; 3] = [
    Highlight {
        title: "Curated catalog",
        body: "Hand-picked products across every category.",
    },
    Highlight {
        title: "Live stock",
        body: "Availability comes straight from the warehouse.",
    },
    Highlight {
        title: "Cart that remembers",
        body: "Your cart is saved between visits.",
    },
];

/// Landing page template.
#[derive(Template, WebTemplate)]
#[template(path = "home.html")]
pub struct HomeTemplate {
    pub flash: Option<Flash>,
    pub highlights: Vec<Highlight>,
}

/// Display the landing page.
#[instrument(skip(session))]
pub async fn home(session: Session) -> impl IntoResponse {
    HomeTemplate {
        flash: take_flash(&session).await,
        highlights: HIGHLIGHTS.to_vec(),
    }
}
