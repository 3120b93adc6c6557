//! Conversion pipeline.
//!
//! A [`Converter`] loads its template archive and rule table once and can
//! then run any number of conversions, from any number of threads.

use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use crate::dom::parse_html;
use crate::error::{Error, Result};
use crate::package::{Template, assemble};
use crate::resolve::{DEFAULT_TIMEOUT, DEFAULT_USER_AGENT, FetchingResolver, ImageResolver};
use crate::transform::{Stylesheet, Transformer};

/// Conversion settings.
#[derive(Debug, Clone)]
pub struct ConvertConfig {
    /// Produce a `.docx` package. When false, the raw document markup is
    /// returned with image placeholders left in place.
    pub create_package: bool,
    /// Timeout of each image fetch.
    pub fetch_timeout: Duration,
    /// `User-Agent` sent with HTTP image requests.
    pub user_agent: String,
}

impl Default for ConvertConfig {
    fn default() -> Self {
        Self {
            create_package: true,
            fetch_timeout: DEFAULT_TIMEOUT,
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}

impl ConvertConfig {
    pub fn with_create_package(mut self, create_package: bool) -> Self {
        self.create_package = create_package;
        self
    }

    pub fn with_fetch_timeout(mut self, timeout: Duration) -> Self {
        self.fetch_timeout = timeout;
        self
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }
}

/// Result of a conversion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Output {
    /// A complete `.docx` archive.
    Package(Vec<u8>),
    /// `word/document.xml` content with unresolved image placeholders.
    Markup(Vec<u8>),
}

impl Output {
    pub fn as_bytes(&self) -> &[u8] {
        match self {
            Output::Package(bytes) | Output::Markup(bytes) => bytes,
        }
    }

    pub fn into_bytes(self) -> Vec<u8> {
        match self {
            Output::Package(bytes) | Output::Markup(bytes) => bytes,
        }
    }

    pub fn is_package(&self) -> bool {
        matches!(self, Output::Package(_))
    }
}

/// HTML to WordprocessingML converter.
///
/// # Example
///
/// ```no_run
/// use html2wordml::{ConvertConfig, Converter};
///
/// let converter = Converter::builder()
///     .config(ConvertConfig::default().with_create_package(true))
///     .build()?;
/// let html = std::fs::read("page.html")?;
/// let docx = converter.convert("https://example.com/docs", &html)?;
/// std::fs::write("page.docx", docx.as_bytes())?;
/// # Ok::<(), html2wordml::Error>(())
/// ```
#[derive(Clone)]
pub struct Converter {
    template: Arc<Template>,
    transformer: Transformer,
    resolver: Arc<dyn ImageResolver>,
    config: ConvertConfig,
}

impl std::fmt::Debug for Converter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Converter")
            .field("entries", &self.template.entries().len())
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl Converter {
    /// Converter with the bundled template, rule table and a fetching
    /// resolver.
    pub fn new() -> Result<Self> {
        Self::builder().build()
    }

    pub fn builder() -> ConverterBuilder {
        ConverterBuilder::default()
    }

    pub fn config(&self) -> &ConvertConfig {
        &self.config
    }

    pub fn template(&self) -> &Template {
        &self.template
    }

    pub fn stylesheet(&self) -> &Stylesheet {
        self.transformer.stylesheet()
    }

    /// Convert `html`, resolving image sources against `base`.
    ///
    /// Images are resolved in both modes, so a missing or undecodable image
    /// fails the call even when only markup is wanted.
    pub fn convert(&self, base: &str, html: &[u8]) -> Result<Output> {
        let doc = parse_html(html);

        let images = self.resolver.resolve(base, &doc)?;
        tracing::debug!(images = images.len(), "resolved images");

        let markup = self.transformer.transform(&doc);
        if !self.config.create_package {
            tracing::debug!(bytes = markup.len(), "converted to markup");
            return Ok(Output::Markup(markup.into_bytes()));
        }

        let package = assemble(&self.template, &markup, &images)?;
        Ok(Output::Package(package))
    }

    /// Convert and write the result to `writer`. Nothing is written when the
    /// conversion fails.
    pub fn convert_to_writer<W: Write>(&self, base: &str, html: &[u8], writer: &mut W) -> Result<()> {
        let output = self.convert(base, html)?;
        writer.write_all(output.as_bytes())?;
        writer.flush()?;
        Ok(())
    }
}

#[derive(Debug)]
enum Source {
    Path(PathBuf),
    Bytes(Vec<u8>),
}

/// Builder for a [`Converter`].
#[derive(Default)]
pub struct ConverterBuilder {
    template: Option<Source>,
    stylesheet: Option<Source>,
    resolver: Option<Arc<dyn ImageResolver>>,
    config: ConvertConfig,
}

impl ConverterBuilder {
    /// Use a `.docx` file as the template.
    pub fn template_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.template = Some(Source::Path(path.into()));
        self
    }

    pub fn template_bytes(mut self, data: Vec<u8>) -> Self {
        self.template = Some(Source::Bytes(data));
        self
    }

    /// Use a rule table file instead of the bundled one.
    pub fn stylesheet_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.stylesheet = Some(Source::Path(path.into()));
        self
    }

    pub fn stylesheet_str(mut self, xml: impl Into<String>) -> Self {
        self.stylesheet = Some(Source::Bytes(xml.into().into_bytes()));
        self
    }

    /// Resolve images with `resolver` instead of fetching them.
    pub fn resolver(mut self, resolver: Arc<dyn ImageResolver>) -> Self {
        self.resolver = Some(resolver);
        self
    }

    pub fn config(mut self, config: ConvertConfig) -> Self {
        self.config = config;
        self
    }

    /// Load and validate the template and rule table.
    pub fn build(self) -> Result<Converter> {
        let template = match self.template {
            None => Template::bundled()?,
            Some(Source::Path(path)) => Template::from_path(&path).map_err(|e| missing(&path, e))?,
            Some(Source::Bytes(data)) => Template::from_bytes(data)?,
        };

        let stylesheet = match self.stylesheet {
            None => Stylesheet::bundled()?,
            Some(Source::Path(path)) => {
                Stylesheet::from_path(&path).map_err(|e| missing(&path, e))?
            }
            Some(Source::Bytes(data)) => {
                let xml = String::from_utf8(data).map_err(|_| {
                    Error::TemplateIntegrity("rule table is not valid UTF-8".to_string())
                })?;
                Stylesheet::parse(&xml)?
            }
        };

        let resolver = match self.resolver {
            Some(resolver) => resolver,
            None => Arc::new(FetchingResolver::new(
                self.config.fetch_timeout,
                &self.config.user_agent,
            )?),
        };

        Ok(Converter {
            template: Arc::new(template),
            transformer: Transformer::new(Arc::new(stylesheet)),
            resolver,
            config: self.config,
        })
    }
}

/// An unreadable template or rule table file is an integrity failure.
fn missing(path: &std::path::Path, err: Error) -> Error {
    match err {
        Error::Io(e) => Error::TemplateIntegrity(format!("{}: {e}", path.display())),
        other => other,
    }
}

/// Convert `html` with the bundled template and rule table.
///
/// Returns package bytes when `create_package` is set, otherwise the
/// document markup with image placeholders left in place.
pub fn convert(base: &str, html: &[u8], create_package: bool) -> Result<Vec<u8>> {
    let config = ConvertConfig::default().with_create_package(create_package);
    let output = Converter::builder().config(config).build()?.convert(base, html)?;
    Ok(output.into_bytes())
}
