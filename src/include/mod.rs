//! The include driver: load the fragment, then wire it, once per page.

use crate::config::Settings;
use crate::fetch::{load_fragment, Fetch, LoadedFragment};
use crate::links::Candidates;
use crate::page::Page;
use crate::wire::{wire, Wiring};
use crate::Error;

/// Loads the shared navigation fragment and wires it into a page.
///
/// Generic over the fetch boundary `F`. Settings are validated once at build
/// time.
///
/// ## Example
///
/// ```no_run
/// use nav_include::{Config, NavInclude, Outcome, Page, SiteDirFetcher};
/// use url::Url;
///
/// # async fn run() -> Result<(), nav_include::Error> {
/// let location = Url::parse("https://example.org/docs/")?;
/// let mut page = Page::parse(location.as_str(), "<main></main>")?;
///
/// let include = NavInclude::builder()
///     .with_fetcher(SiteDirFetcher::new("site", location))
///     .with_settings(Config::builder().with_file("site/nav.toml", false).build_settings()?)
///     .build()?;
///
/// if let Outcome::Injected(wiring) = include.run(&mut page).await {
///     println!("site root: {}", wiring.site_root);
/// }
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct NavInclude<F> {
    fetcher: F,
    settings: Settings,
}

/// How a run ended. A run never fails the page; failures are reported here
/// and logged.
#[derive(Debug)]
pub enum Outcome {
    Injected(Wiring),
    /// Every candidate failed; the page is unchanged.
    Unavailable,
    /// The fragment loaded but could not be wired; the page is unchanged.
    Failed(Error),
}

impl Outcome {
    pub fn is_injected(&self) -> bool {
        matches!(self, Outcome::Injected(_))
    }
}

impl NavInclude<()> {
    pub fn builder() -> NavIncludeBuilder<()> {
        NavIncludeBuilder {
            fetcher: None,
            settings: Settings::default(),
        }
    }
}

/// Builder for [`NavInclude`].
///
/// Starts without a fetcher (`NavIncludeBuilder<()>`) and becomes
/// `NavIncludeBuilder<F>` once [`with_fetcher`](Self::with_fetcher) is called.
#[derive(Debug)]
#[must_use = "builders do nothing until .build() is called"]
pub struct NavIncludeBuilder<F> {
    fetcher: Option<F>,
    settings: Settings,
}

impl NavIncludeBuilder<()> {
    pub fn with_fetcher<F: Fetch>(self, fetcher: F) -> NavIncludeBuilder<F> {
        NavIncludeBuilder {
            fetcher: Some(fetcher),
            settings: self.settings,
        }
    }
}

impl<F> NavIncludeBuilder<F> {
    /// Replaces the default settings.
    pub fn with_settings(mut self, settings: Settings) -> Self {
        self.settings = settings;
        self
    }

    /// Fails if no fetcher was provided or the settings are invalid.
    pub fn build(self) -> Result<NavInclude<F>, Error> {
        self.settings.validate()?;
        Ok(NavInclude {
            fetcher: self.fetcher.ok_or(Error::MissingFetcher)?,
            settings: self.settings,
        })
    }
}

impl<F: Fetch> NavInclude<F> {
    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn candidates(&self, page: &Page) -> Candidates {
        Candidates::build(
            page.location(),
            page.script_src(),
            self.settings.fragment_path(),
        )
    }

    /// Fetches the fragment without touching the page.
    pub async fn load(&self, page: &Page) -> Option<LoadedFragment> {
        load_fragment(&self.fetcher, &self.candidates(page)).await
    }

    /// Loads and wires the fragment. The fetch is the only suspension
    /// point; all page mutation happens after it, synchronously.
    pub async fn run(&self, page: &mut Page) -> Outcome {
        if page.injected().is_some() {
            return Outcome::Failed(Error::AlreadyInjected);
        }
        let Some(fragment) = self.load(page).await else {
            return Outcome::Unavailable;
        };
        match wire(page, &fragment, &self.settings) {
            Ok(wiring) => Outcome::Injected(wiring),
            Err(err) => {
                tracing::error!(error = %err, served = %fragment.served_url, "nav fragment not wired");
                Outcome::Failed(err)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RootPolicy;
    use crate::fetch::{FetchError, FetchResponse};
    use crate::ConfigError;

    struct Unreachable;

    impl Fetch for Unreachable {
        async fn get(&self, url: &str) -> Result<FetchResponse, FetchError> {
            Err(FetchError::Network {
                url: url.into(),
                message: "offline".into(),
            })
        }
    }

    #[test]
    fn test_builder_requires_fetcher() {
        let result = NavInclude::builder().build();
        assert!(matches!(result, Err(Error::MissingFetcher)));
    }

    #[test]
    fn test_builder_validates_settings() {
        let settings = Settings {
            root: RootPolicy::Fixed { path: "relative".into() },
            ..Settings::default()
        };
        let result = NavInclude::builder()
            .with_fetcher(Unreachable)
            .with_settings(settings)
            .build();
        assert!(matches!(result, Err(Error::Config(ConfigError::InvalidValue { .. }))));
    }

    #[test]
    fn test_candidates_use_page_and_settings() {
        let include = NavInclude::builder()
            .with_fetcher(Unreachable)
            .with_settings(Settings {
                fragment_path: "partials/nav.html".into(),
                ..Settings::default()
            })
            .build()
            .unwrap();
        let page = Page::parse("https://example.org/a/", "")
            .unwrap()
            .with_script_src("/js/nav.js");

        let candidates = include.candidates(&page);

        assert_eq!(include.settings().fragment_path(), "partials/nav.html");
        assert_eq!(
            candidates.as_slice(),
            [
                "https://example.org/js/partials/nav.html",
                "https://example.org/a/partials/nav.html",
                "https://example.org/partials/nav.html",
                "partials/nav.html",
                "./partials/nav.html",
            ]
        );
    }

    #[tokio::test(flavor = "current_thread")]
    async fn test_unreachable_fragment_leaves_page_alone() {
        let include = NavInclude::builder().with_fetcher(Unreachable).build().unwrap();
        let mut page = Page::parse("https://example.org/", "<main></main>").unwrap();

        assert!(matches!(include.run(&mut page).await, Outcome::Unavailable));
        assert!(page.injected().is_none());
        assert!(page.listeners().is_empty());
    }
}
