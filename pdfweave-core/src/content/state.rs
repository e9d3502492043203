//! Graphics state tracked while scanning content (ISO 32000-1 Section 8.4).

use crate::document::{ResourceKind, Resources};
use crate::geometry::Matrix;
use crate::objects::{Dictionary, Object};

use super::operation::operators::*;
use super::operation::Operation;
use super::ContentError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u8)]
pub enum LineCap {
    #[default]
    Butt = 0,
    Round = 1,
    Square = 2,
}

impl LineCap {
    fn from_code(code: i64) -> Self {
        match code {
            1 => LineCap::Round,
            2 => LineCap::Square,
            _ => LineCap::Butt,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u8)]
pub enum LineJoin {
    #[default]
    Miter = 0,
    Round = 1,
    Bevel = 2,
}

impl LineJoin {
    fn from_code(code: i64) -> Self {
        match code {
            1 => LineJoin::Round,
            2 => LineJoin::Bevel,
            _ => LineJoin::Miter,
        }
    }
}

/// Text rendering mode (`Tr`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u8)]
pub enum TextRenderingMode {
    #[default]
    Fill = 0,
    Stroke = 1,
    FillStroke = 2,
    Invisible = 3,
    FillClip = 4,
    StrokeClip = 5,
    FillStrokeClip = 6,
    Clip = 7,
}

impl TextRenderingMode {
    fn from_code(code: i64) -> Self {
        match code {
            1 => TextRenderingMode::Stroke,
            2 => TextRenderingMode::FillStroke,
            3 => TextRenderingMode::Invisible,
            4 => TextRenderingMode::FillClip,
            5 => TextRenderingMode::StrokeClip,
            6 => TextRenderingMode::FillStrokeClip,
            7 => TextRenderingMode::Clip,
            _ => TextRenderingMode::Fill,
        }
    }
}

/// Line dash pattern specification
#[derive(Debug, Clone, PartialEq, Default)]
pub struct LineDashPattern {
    /// Array of dash and gap lengths
    pub array: Vec<f64>,
    /// Phase offset
    pub phase: f64,
}

impl LineDashPattern {
    fn from_operands(array: &[Object], phase: f64) -> Self {
        Self {
            array: array.iter().filter_map(Object::as_real).collect(),
            phase,
        }
    }
}

/// Color value in the current color space.
#[derive(Debug, Clone, PartialEq)]
pub enum Color {
    Gray(f64),
    Rgb(f64, f64, f64),
    Cmyk(f64, f64, f64, f64),
    /// Components of any other color space.
    Components(Vec<f64>),
    /// Pattern name, plus components for uncolored patterns.
    Pattern { name: Option<String>, components: Vec<f64> },
}

impl Default for Color {
    fn default() -> Self {
        Color::Gray(0.0)
    }
}

impl Color {
    /// Initial color of a color space family.
    fn initial(space: &str) -> Self {
        match space {
            "DeviceGray" | "CalGray" | "G" => Color::Gray(0.0),
            "DeviceRGB" | "CalRGB" | "RGB" => Color::Rgb(0.0, 0.0, 0.0),
            "DeviceCMYK" | "CMYK" => Color::Cmyk(0.0, 0.0, 0.0, 1.0),
            "Pattern" => Color::Pattern {
                name: None,
                components: Vec::new(),
            },
            _ => Color::Components(vec![0.0]),
        }
    }

    fn from_components(space: &str, components: Vec<f64>) -> Self {
        match (space, components.as_slice()) {
            ("DeviceGray" | "CalGray" | "G", [g]) => Color::Gray(*g),
            ("DeviceRGB" | "CalRGB" | "RGB", [r, g, b]) => Color::Rgb(*r, *g, *b),
            ("DeviceCMYK" | "CMYK", [c, m, y, k]) => Color::Cmyk(*c, *m, *y, *k),
            _ => Color::Components(components),
        }
    }
}

/// Font selected with `Tf` (or an ExtGState `Font` entry).
#[derive(Debug, Clone, PartialEq)]
pub struct FontState {
    /// Resource name; empty when set through an ExtGState.
    pub name: String,
    pub size: f64,
    /// Font dictionary from the resources, when it could be found.
    pub dictionary: Option<Dictionary>,
}

/// One level of graphics state.
///
/// Cloning deep-copies every field, matrices included, so a child level
/// never aliases its parent.
#[derive(Debug, Clone, PartialEq)]
pub struct GraphicsState {
    pub ctm: Matrix,
    pub text_matrix: Matrix,
    pub text_line_matrix: Matrix,

    pub fill_color_space: String,
    pub stroke_color_space: String,
    pub fill_color: Color,
    pub stroke_color: Color,

    pub font: Option<FontState>,
    pub char_spacing: f64,
    pub word_spacing: f64,
    /// `Tz` divided by 100.
    pub horizontal_scaling: f64,
    pub leading: f64,
    pub rise: f64,
    pub render_mode: TextRenderingMode,

    pub line_width: f64,
    pub line_cap: LineCap,
    pub line_join: LineJoin,
    pub miter_limit: f64,
    pub dash_pattern: LineDashPattern,
    pub rendering_intent: String,
    pub flatness: f64,

    /// `BM` entry; a list in order of preference.
    pub blend_modes: Vec<String>,
    pub fill_alpha: f64,
    pub stroke_alpha: f64,
}

impl Default for GraphicsState {
    fn default() -> Self {
        Self::with_ctm(Matrix::IDENTITY)
    }
}

impl GraphicsState {
    pub fn with_ctm(ctm: Matrix) -> Self {
        Self {
            ctm,
            text_matrix: Matrix::IDENTITY,
            text_line_matrix: Matrix::IDENTITY,
            fill_color_space: "DeviceGray".to_string(),
            stroke_color_space: "DeviceGray".to_string(),
            fill_color: Color::default(),
            stroke_color: Color::default(),
            font: None,
            char_spacing: 0.0,
            word_spacing: 0.0,
            horizontal_scaling: 1.0,
            leading: 0.0,
            rise: 0.0,
            render_mode: TextRenderingMode::Fill,
            line_width: 1.0,
            line_cap: LineCap::Butt,
            line_join: LineJoin::Miter,
            miter_limit: 10.0,
            dash_pattern: LineDashPattern::default(),
            rendering_intent: "RelativeColorimetric".to_string(),
            flatness: 1.0,
            blend_modes: vec!["Normal".to_string()],
            fill_alpha: 1.0,
            stroke_alpha: 1.0,
        }
    }

    /// Text matrices are reset at the start of every text object.
    pub fn begin_text(&mut self) {
        self.text_matrix = Matrix::IDENTITY;
        self.text_line_matrix = Matrix::IDENTITY;
    }

    pub fn font_size(&self) -> f64 {
        self.font.as_ref().map_or(0.0, |font| font.size)
    }

    /// Applies the effect of `op`. Operators without a state effect and
    /// unknown operators are ignored.
    pub fn apply(&mut self, op: &Operation, resources: Option<&Resources>) -> Result<(), ContentError> {
        match op.operator.as_str() {
            CONCAT_MATRIX => self.ctm = op.matrix(0)?.concat(&self.ctm),
            SET_LINE_WIDTH => self.line_width = op.number(0)?,
            SET_LINE_CAP => self.line_cap = LineCap::from_code(op.integer(0)?),
            SET_LINE_JOIN => self.line_join = LineJoin::from_code(op.integer(0)?),
            SET_MITER_LIMIT => self.miter_limit = op.number(0)?,
            SET_DASH => self.dash_pattern = LineDashPattern::from_operands(op.array(0)?, op.number(1)?),
            SET_RENDERING_INTENT => self.rendering_intent = op.name(0)?.to_string(),
            SET_FLATNESS => self.flatness = op.number(0)?,
            APPLY_EXT_GSTATE => {
                let name = op.name(0)?;
                match resources.and_then(|r| r.get(ResourceKind::ExtGState, name)).and_then(Object::as_dict) {
                    Some(ext) => self.apply_ext_gstate(ext),
                    None => tracing::warn!(name, "ExtGState not found in resources"),
                }
            }

            BEGIN_TEXT => self.begin_text(),
            SET_CHAR_SPACING => self.char_spacing = op.number(0)?,
            SET_WORD_SPACING => self.word_spacing = op.number(0)?,
            SET_HORIZONTAL_SCALING => self.horizontal_scaling = op.number(0)? / 100.0,
            SET_LEADING => self.leading = op.number(0)?,
            SET_RISE => self.rise = op.number(0)?,
            SET_RENDER_MODE => self.render_mode = TextRenderingMode::from_code(op.integer(0)?),
            SET_FONT => {
                let name = op.name(0)?;
                let dictionary = resources
                    .and_then(|r| r.get(ResourceKind::Font, name))
                    .and_then(Object::as_dict)
                    .cloned();
                if dictionary.is_none() {
                    tracing::debug!(name, "font not found in resources");
                }
                self.font = Some(FontState {
                    name: name.to_string(),
                    size: op.number(1)?,
                    dictionary,
                });
            }
            MOVE_TEXT => self.move_text(op.number(0)?, op.number(1)?),
            MOVE_TEXT_SET_LEADING => {
                let (tx, ty) = (op.number(0)?, op.number(1)?);
                self.leading = -ty;
                self.move_text(tx, ty);
            }
            SET_TEXT_MATRIX => {
                let m = op.matrix(0)?;
                self.text_matrix = m;
                self.text_line_matrix = m;
            }
            NEXT_LINE | NEXT_LINE_SHOW_TEXT => self.move_text(0.0, -self.leading),
            NEXT_LINE_SPACING_SHOW_TEXT => {
                self.word_spacing = op.number(0)?;
                self.char_spacing = op.number(1)?;
                self.move_text(0.0, -self.leading);
            }

            SET_FILL_COLOR_SPACE => {
                let space = op.name(0)?.to_string();
                self.fill_color = Color::initial(&family(&space, resources));
                self.fill_color_space = space;
            }
            SET_STROKE_COLOR_SPACE => {
                let space = op.name(0)?.to_string();
                self.stroke_color = Color::initial(&family(&space, resources));
                self.stroke_color_space = space;
            }
            SET_FILL_COLOR | SET_FILL_COLOR_N => {
                self.fill_color = color_operands(op, &family(&self.fill_color_space, resources))?;
            }
            SET_STROKE_COLOR | SET_STROKE_COLOR_N => {
                self.stroke_color = color_operands(op, &family(&self.stroke_color_space, resources))?;
            }
            SET_FILL_GRAY => self.set_fill("DeviceGray", Color::Gray(op.number(0)?)),
            SET_STROKE_GRAY => self.set_stroke("DeviceGray", Color::Gray(op.number(0)?)),
            SET_FILL_RGB => {
                let color = Color::Rgb(op.number(0)?, op.number(1)?, op.number(2)?);
                self.set_fill("DeviceRGB", color);
            }
            SET_STROKE_RGB => {
                let color = Color::Rgb(op.number(0)?, op.number(1)?, op.number(2)?);
                self.set_stroke("DeviceRGB", color);
            }
            SET_FILL_CMYK => {
                let color = Color::Cmyk(op.number(0)?, op.number(1)?, op.number(2)?, op.number(3)?);
                self.set_fill("DeviceCMYK", color);
            }
            SET_STROKE_CMYK => {
                let color = Color::Cmyk(op.number(0)?, op.number(1)?, op.number(2)?, op.number(3)?);
                self.set_stroke("DeviceCMYK", color);
            }
            _ => {}
        }
        Ok(())
    }

    fn move_text(&mut self, tx: f64, ty: f64) {
        self.text_line_matrix = Matrix::translate(tx, ty).concat(&self.text_line_matrix);
        self.text_matrix = self.text_line_matrix;
    }

    fn set_fill(&mut self, space: &str, color: Color) {
        self.fill_color_space = space.to_string();
        self.fill_color = color;
    }

    fn set_stroke(&mut self, space: &str, color: Color) {
        self.stroke_color_space = space.to_string();
        self.stroke_color = color;
    }

    /// Applies the entries of an ExtGState dictionary this state tracks.
    pub fn apply_ext_gstate(&mut self, ext: &Dictionary) {
        for (key, value) in ext.iter() {
            match (key.as_str(), value) {
                ("LW", v) => self.line_width = v.as_real().unwrap_or(self.line_width),
                ("LC", v) => self.line_cap = v.as_integer().map_or(self.line_cap, LineCap::from_code),
                ("LJ", v) => self.line_join = v.as_integer().map_or(self.line_join, LineJoin::from_code),
                ("ML", v) => self.miter_limit = v.as_real().unwrap_or(self.miter_limit),
                ("D", Object::Array(pattern)) => {
                    if let (Some(array), Some(phase)) = (
                        pattern.first().and_then(Object::as_array),
                        pattern.get(1).and_then(Object::as_real),
                    ) {
                        self.dash_pattern = LineDashPattern::from_operands(array, phase);
                    }
                }
                ("RI", Object::Name(intent)) => self.rendering_intent = intent.clone(),
                ("FL", v) => self.flatness = v.as_real().unwrap_or(self.flatness),
                ("Font", Object::Array(font)) => {
                    if let Some(size) = font.get(1).and_then(Object::as_real) {
                        self.font = Some(FontState {
                            name: String::new(),
                            size,
                            dictionary: font.first().and_then(Object::as_dict).cloned(),
                        });
                    }
                }
                ("BM", Object::Name(mode)) => self.blend_modes = vec![mode.clone()],
                ("BM", Object::Array(modes)) => {
                    self.blend_modes = modes
                        .iter()
                        .filter_map(Object::as_name)
                        .map(str::to_string)
                        .collect();
                }
                ("CA", v) => self.stroke_alpha = v.as_real().unwrap_or(self.stroke_alpha),
                ("ca", v) => self.fill_alpha = v.as_real().unwrap_or(self.fill_alpha),
                _ => {}
            }
        }
    }
}

/// Color space family of `space`: device names as-is, named resources
/// looked up in the `ColorSpace` category.
fn family(space: &str, resources: Option<&Resources>) -> String {
    if matches!(
        space,
        "DeviceGray" | "DeviceRGB" | "DeviceCMYK" | "Pattern" | "G" | "RGB" | "CMYK"
    ) {
        return space.to_string();
    }
    let resolved = resources.and_then(|r| r.get(ResourceKind::ColorSpace, space));
    match resolved {
        Some(Object::Name(name)) => name.clone(),
        Some(Object::Array(items)) => items
            .first()
            .and_then(Object::as_name)
            .unwrap_or(space)
            .to_string(),
        _ => space.to_string(),
    }
}

fn color_operands(op: &Operation, family: &str) -> Result<Color, ContentError> {
    if family == "Pattern" {
        let (name, count) = match op.operands.last() {
            Some(Object::Name(name)) => (Some(name.clone()), op.operands.len() - 1),
            _ => (None, op.operands.len()),
        };
        let components = (0..count).map(|i| op.number(i)).collect::<Result<_, _>>()?;
        return Ok(Color::Pattern { name, components });
    }
    Ok(Color::from_components(family, op.numbers()?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Point;

    fn op(operator: &str, operands: Vec<Object>) -> Operation {
        Operation::new(operator, operands)
    }

    #[test]
    fn test_cm_premultiplies() {
        let mut state = GraphicsState::with_ctm(Matrix::scale(2.0, 2.0));
        state
            .apply(&op(CONCAT_MATRIX, vec![1.into(), 0.into(), 0.into(), 1.into(), 10.into(), 0.into()]), None)
            .unwrap();
        // Translation happens in user space, before the outer scale.
        assert_eq!(state.ctm.transform_point(Point::origin()), Point::new(20.0, 0.0));
    }

    #[test]
    fn test_text_positioning() {
        let mut state = GraphicsState::default();
        state.apply(&op(BEGIN_TEXT, vec![]), None).unwrap();
        state.apply(&op(MOVE_TEXT_SET_LEADING, vec![10.into(), Object::Integer(-14)]), None).unwrap();
        assert_eq!(state.leading, 14.0);
        state.apply(&op(NEXT_LINE, vec![]), None).unwrap();
        assert_eq!(state.text_matrix.transform_point(Point::origin()), Point::new(10.0, -28.0));
        state
            .apply(
                &op(
                    NEXT_LINE_SPACING_SHOW_TEXT,
                    vec![2.into(), 1.into(), Object::string(b"x".to_vec())],
                ),
                None,
            )
            .unwrap();
        assert_eq!(state.word_spacing, 2.0);
        assert_eq!(state.char_spacing, 1.0);
        assert_eq!(state.text_line_matrix.f, -42.0);
    }

    #[test]
    fn test_colors() {
        let mut state = GraphicsState::default();
        state.apply(&op(SET_FILL_RGB, vec![1.into(), 0.into(), 0.into()]), None).unwrap();
        assert_eq!(state.fill_color, Color::Rgb(1.0, 0.0, 0.0));
        assert_eq!(state.fill_color_space, "DeviceRGB");

        state.apply(&op(SET_STROKE_COLOR_SPACE, vec![Object::name("DeviceCMYK")]), None).unwrap();
        assert_eq!(state.stroke_color, Color::Cmyk(0.0, 0.0, 0.0, 1.0));
        state
            .apply(&op(SET_STROKE_COLOR, vec![0.into(), 1.into(), 0.into(), 0.into()]), None)
            .unwrap();
        assert_eq!(state.stroke_color, Color::Cmyk(0.0, 1.0, 0.0, 0.0));

        state.apply(&op(SET_FILL_COLOR_SPACE, vec![Object::name("Pattern")]), None).unwrap();
        state.apply(&op(SET_FILL_COLOR_N, vec![Object::name("P0")]), None).unwrap();
        assert_eq!(
            state.fill_color,
            Color::Pattern {
                name: Some("P0".to_string()),
                components: vec![]
            }
        );
    }

    #[test]
    fn test_malformed_operand_is_reported() {
        let mut state = GraphicsState::default();
        let err = state.apply(&op(SET_LINE_WIDTH, vec![Object::name("thick")]), None).unwrap_err();
        assert!(matches!(err, ContentError::MalformedOperand { index: 0, .. }));
        // Unknown operators are ignored.
        state.apply(&op("zz", vec![Object::name("x")]), None).unwrap();
    }

    #[test]
    fn test_ext_gstate_entries() {
        let mut ext = Dictionary::new();
        ext.set("LW", 4);
        ext.set("LC", 1);
        ext.set("BM", Object::Array(vec![Object::name("Multiply"), Object::name("Normal")]));
        ext.set("ca", Object::Real(0.5));
        ext.set("D", Object::Array(vec![Object::Array(vec![3.into(), 2.into()]), 1.into()]));

        let mut state = GraphicsState::default();
        state.apply_ext_gstate(&ext);
        assert_eq!(state.line_width, 4.0);
        assert_eq!(state.line_cap, LineCap::Round);
        assert_eq!(state.blend_modes, vec!["Multiply", "Normal"]);
        assert_eq!(state.fill_alpha, 0.5);
        assert_eq!(state.dash_pattern.array, vec![3.0, 2.0]);
        assert_eq!(state.dash_pattern.phase, 1.0);
    }
}
