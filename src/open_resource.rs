use regex::Regex;

/// Pattern set matching the resources the original deployment serves without
/// a session: cache-busted bundles, framework assets, images, and styles.
pub const DEFAULT_OPEN_RESOURCE_PATTERN: &str = r".*/gxt/.*|.*nocache.*|.*\.cache\..*|.*/bootstrap\.min\..*|angular\.min\.js|.*/zapatec/.*\..*|.*/pdfjs/.*\.js(?:\?.*)?$|.*\.(jpg|jpeg|png|gif|svg)(?:\?.*)?$|.*\.css(?:\?.*)?$";

/// An allow-list that exempts static/public assets from the gate entirely.
///
/// The pattern is compiled once at construction and owned by the
/// [`GateConfig`](crate::GateConfig); a compilation failure is fatal at
/// construction, not at request time.
#[derive(Debug, Clone)]
pub struct OpenResourceClassifier {
    pattern: Option<Regex>,
}

impl OpenResourceClassifier {
    /// Compiles the pattern. `None` classifies nothing as open.
    pub fn new(pattern: Option<&str>) -> Result<Self, regex::Error> {
        let pattern = match pattern {
            Some(p) if !p.trim().is_empty() => Some(Regex::new(p)?),
            _ => None,
        };
        Ok(Self { pattern })
    }

    /// Whether the request path bypasses the gate.
    pub fn is_open(&self, path: &str) -> bool {
        self.pattern
            .as_ref()
            .is_some_and(|pattern| pattern.is_match(path))
    }
}
