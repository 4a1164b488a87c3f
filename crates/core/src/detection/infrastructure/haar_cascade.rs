//! Boosted Haar cascade in OpenCV's `opencv-cascade-classifier` XML layout.
//!
//! Only upright HAAR features with BOOST stages are supported. Weak
//! classifiers may be stumps or small trees.

use std::path::Path;

use roxmltree::Node;
use thiserror::Error;

use super::integral_image::IntegralImage;

/// Slack applied to stage thresholds, matching single-precision training output.
const STAGE_THRESHOLD_EPS: f64 = 1e-5;

#[derive(Error, Debug)]
pub enum CascadeError {
    #[error("failed to read cascade file: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid cascade XML: {0}")]
    Xml(#[from] roxmltree::Error),
    #[error("legacy opencv-haar-classifier cascades are not supported")]
    LegacyFormat,
    #[error("unsupported cascade: {0}")]
    Unsupported(String),
    #[error("missing <{0}> element")]
    Missing(&'static str),
    #[error("malformed cascade: {0}")]
    Malformed(String),
}

#[derive(Clone, Debug)]
struct WeightedRect {
    x: u32,
    y: u32,
    width: u32,
    height: u32,
    weight: f64,
}

#[derive(Clone, Debug)]
struct HaarFeature {
    rects: Vec<WeightedRect>,
}

impl HaarFeature {
    fn value(&self, ii: &IntegralImage, x: u32, y: u32) -> f64 {
        self.rects
            .iter()
            .map(|r| r.weight * ii.rect_sum(x + r.x, y + r.y, r.width, r.height) as f64)
            .sum()
    }
}

/// Split node of a weak classifier. Child indices `<= 0` address leaves
/// (`leaf = -index`), positive ones address further nodes.
#[derive(Clone, Debug)]
struct SplitNode {
    left: i32,
    right: i32,
    feature: usize,
    threshold: f64,
}

#[derive(Clone, Debug)]
struct WeakClassifier {
    nodes: Vec<SplitNode>,
    leaves: Vec<f64>,
}

impl WeakClassifier {
    fn predict(&self, feature_value: impl Fn(usize) -> f64) -> f64 {
        let mut idx = 0i32;
        loop {
            let node = &self.nodes[idx as usize];
            idx = if feature_value(node.feature) < node.threshold {
                node.left
            } else {
                node.right
            };
            if idx <= 0 {
                return self.leaves[(-idx) as usize];
            }
        }
    }
}

#[derive(Clone, Debug)]
struct Stage {
    threshold: f64,
    classifiers: Vec<WeakClassifier>,
}

/// A parsed cascade, ready to be evaluated on integral images.
#[derive(Clone, Debug)]
pub struct HaarCascade {
    window_width: u32,
    window_height: u32,
    stages: Vec<Stage>,
    features: Vec<HaarFeature>,
}

impl HaarCascade {
    pub fn from_file(path: &Path) -> Result<Self, CascadeError> {
        let xml = std::fs::read_to_string(path)?;
        Self::parse(&xml)
    }

    pub fn parse(xml: &str) -> Result<Self, CascadeError> {
        let doc = roxmltree::Document::parse(xml)?;
        let storage = doc.root_element();

        let cascade = match elements(storage).next() {
            Some(node) if node.attribute("type_id") == Some("opencv-haar-classifier") => {
                return Err(CascadeError::LegacyFormat);
            }
            Some(node) if node.tag_name().name() == "cascade" => node,
            _ => return Err(CascadeError::Missing("cascade")),
        };

        let stage_type = text(child(cascade, "stageType")?);
        if stage_type != "BOOST" {
            return Err(CascadeError::Unsupported(format!("stage type {stage_type}")));
        }
        let feature_type = text(child(cascade, "featureType")?);
        if feature_type != "HAAR" {
            return Err(CascadeError::Unsupported(format!("feature type {feature_type}")));
        }
        if let Some(params) = elements(cascade).find(|n| n.tag_name().name() == "featureParams") {
            if let Ok(cat) = child(params, "maxCatCount") {
                if parse_num::<u32>(text(cat))? > 0 {
                    return Err(CascadeError::Unsupported("categorical splits".into()));
                }
            }
        }

        let window_width: u32 = parse_num(text(child(cascade, "width")?))?;
        let window_height: u32 = parse_num(text(child(cascade, "height")?))?;
        if window_width < 3 || window_height < 3 {
            return Err(CascadeError::Malformed(format!(
                "window {window_width}x{window_height} is too small"
            )));
        }

        let features = elements(child(cascade, "features")?)
            .map(|f| parse_feature(f, window_width, window_height))
            .collect::<Result<Vec<_>, _>>()?;

        let stages = elements(child(cascade, "stages")?)
            .map(|s| parse_stage(s, features.len()))
            .collect::<Result<Vec<_>, _>>()?;
        if stages.is_empty() {
            return Err(CascadeError::Malformed("cascade has no stages".into()));
        }

        Ok(Self {
            window_width,
            window_height,
            stages,
            features,
        })
    }

    /// Training window size `(width, height)`.
    pub fn window_size(&self) -> (u32, u32) {
        (self.window_width, self.window_height)
    }

    pub fn stage_count(&self) -> usize {
        self.stages.len()
    }

    /// Runs every stage on the window whose top-left corner is `(x, y)`.
    ///
    /// Feature values are normalised by the window's standard deviation.
    /// The caller keeps the window inside the integral image.
    pub fn accepts(&self, ii: &IntegralImage, x: u32, y: u32) -> bool {
        let norm = self.variance_norm(ii, x, y);

        self.stages.iter().all(|stage| {
            let sum: f64 = stage
                .classifiers
                .iter()
                .map(|c| c.predict(|f| self.features[f].value(ii, x, y) * norm))
                .sum();
            sum >= stage.threshold - STAGE_THRESHOLD_EPS
        })
    }

    /// `1 / (area * stddev)` over the window interior.
    /// Flat windows get a unit norm and are still evaluated.
    fn variance_norm(&self, ii: &IntegralImage, x: u32, y: u32) -> f64 {
        let (w, h) = (self.window_width - 2, self.window_height - 2);
        let area = (w as f64) * (h as f64);
        let sum = ii.rect_sum(x + 1, y + 1, w, h) as f64;
        let sq_sum = ii.rect_sq_sum(x + 1, y + 1, w, h) as f64;
        let nf = area * sq_sum - sum * sum;
        if nf > 0.0 {
            1.0 / nf.sqrt()
        } else {
            1.0
        }
    }
}

fn parse_feature(node: Node, win_w: u32, win_h: u32) -> Result<HaarFeature, CascadeError> {
    if let Ok(tilted) = child(node, "tilted") {
        if text(tilted) != "0" {
            return Err(CascadeError::Unsupported("tilted features".into()));
        }
    }

    let mut rects = Vec::new();
    for r in elements(child(node, "rects")?) {
        let nums: Vec<&str> = text(r).split_whitespace().collect();
        if nums.len() != 5 {
            return Err(CascadeError::Malformed(format!(
                "feature rect needs 5 values, got {}",
                nums.len()
            )));
        }
        let rect = WeightedRect {
            x: parse_num(nums[0])?,
            y: parse_num(nums[1])?,
            width: parse_num(nums[2])?,
            height: parse_num(nums[3])?,
            weight: parse_num(nums[4])?,
        };
        if rect.x + rect.width > win_w || rect.y + rect.height > win_h {
            return Err(CascadeError::Malformed(
                "feature rect exceeds detection window".into(),
            ));
        }
        rects.push(rect);
    }
    if rects.is_empty() {
        return Err(CascadeError::Malformed("feature without rects".into()));
    }
    Ok(HaarFeature { rects })
}

fn parse_stage(node: Node, feature_count: usize) -> Result<Stage, CascadeError> {
    let threshold = parse_num(text(child(node, "stageThreshold")?))?;
    let classifiers = elements(child(node, "weakClassifiers")?)
        .map(|c| parse_weak_classifier(c, feature_count))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Stage {
        threshold,
        classifiers,
    })
}

fn parse_weak_classifier(node: Node, feature_count: usize) -> Result<WeakClassifier, CascadeError> {
    let raw: Vec<&str> = text(child(node, "internalNodes")?)
        .split_whitespace()
        .collect();
    if raw.is_empty() || raw.len() % 4 != 0 {
        return Err(CascadeError::Malformed(format!(
            "internalNodes has {} values, expected a multiple of 4",
            raw.len()
        )));
    }
    let leaves = text(child(node, "leafValues")?)
        .split_whitespace()
        .map(parse_num)
        .collect::<Result<Vec<f64>, _>>()?;

    let mut nodes = Vec::with_capacity(raw.len() / 4);
    for chunk in raw.chunks_exact(4) {
        let n = SplitNode {
            left: parse_num(chunk[0])?,
            right: parse_num(chunk[1])?,
            feature: parse_num(chunk[2])?,
            threshold: parse_num(chunk[3])?,
        };
        if n.feature >= feature_count {
            return Err(CascadeError::Malformed(format!(
                "feature index {} out of range ({feature_count} features)",
                n.feature
            )));
        }
        nodes.push(n);
    }

    for n in &nodes {
        for idx in [n.left, n.right] {
            let in_range = if idx > 0 {
                (idx as usize) < nodes.len()
            } else {
                ((-idx) as usize) < leaves.len()
            };
            if !in_range {
                return Err(CascadeError::Malformed(format!(
                    "tree child {idx} out of range"
                )));
            }
        }
    }

    Ok(WeakClassifier { nodes, leaves })
}

fn elements<'a, 'input>(node: Node<'a, 'input>) -> impl Iterator<Item = Node<'a, 'input>> {
    node.children().filter(|n| n.is_element())
}

fn child<'a, 'input>(node: Node<'a, 'input>, name: &'static str) -> Result<Node<'a, 'input>, CascadeError> {
    elements(node)
        .find(|n| n.tag_name().name() == name)
        .ok_or(CascadeError::Missing(name))
}

fn text<'a>(node: Node<'a, '_>) -> &'a str {
    node.text().unwrap_or("").trim()
}

fn parse_num<T: std::str::FromStr>(s: &str) -> Result<T, CascadeError> {
    s.parse()
        .map_err(|_| CascadeError::Malformed(format!("invalid number {s:?}")))
}
