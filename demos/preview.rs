//! Renders a page of a local static site with the nav fragment wired in.
//!
//! ```text
//! cargo run --example preview -- <site-dir> [page-path]
//! RUST_LOG=nav_include=debug cargo run --example preview -- demos/site /docs/
//! ```
//!
//! Page files hold body markup only. Settings come from
//! `<site-dir>/nav.toml` when present, overridden by `NAV__*` environment
//! variables (e.g. `NAV__ROOT__MODE=fixed`).

use std::path::PathBuf;

use nav_include::{Config, NavInclude, Outcome, Page, SiteDirFetcher};
use tracing_subscriber::EnvFilter;
use url::Url;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), nav_include::Error> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let mut args = std::env::args().skip(1);
    let site = PathBuf::from(args.next().unwrap_or_else(|| "demos/site".into()));
    let page_path = args.next().unwrap_or_else(|| "/".into());

    let location = Url::parse("http://localhost/")?.join(&page_path)?;
    let body = std::fs::read_to_string(page_file(&site, &location)).unwrap_or_default();
    let mut page = Page::parse(location.as_str(), &body)?;

    let settings = Config::builder()
        .with_file(site.join("nav.toml"), false)
        .with_env("NAV", "__")
        .build_settings()?;

    let include = NavInclude::builder()
        .with_fetcher(SiteDirFetcher::new(&site, location))
        .with_settings(settings)
        .build()?;

    match include.run(&mut page).await {
        Outcome::Injected(wiring) => {
            eprintln!(
                "root={} links={} clicks={} menu={} active={}",
                wiring.site_root,
                wiring.resolved_links,
                wiring.click_targets,
                wiring.menu_attached,
                wiring.active_links.len()
            );
        }
        Outcome::Unavailable => eprintln!("no nav fragment found under {}", site.display()),
        Outcome::Failed(err) => return Err(err),
    }

    let doc = page.document();
    println!("{}", doc.outer_html(doc.body()));
    Ok(())
}

fn page_file(site: &std::path::Path, location: &Url) -> PathBuf {
    let mut path = site.to_path_buf();
    path.extend(location.path_segments().into_iter().flatten().filter(|s| !s.is_empty()));
    if location.path().ends_with('/') {
        path.push("index.html");
    }
    path
}
