//! Content stream operations.

use crate::geometry::Matrix;
use crate::objects::{Object, PdfString};

use super::ContentError;

/// Operator keywords (ISO 32000-1 Annex A).
pub mod operators {
    // General graphics state
    pub const SET_LINE_WIDTH: &str = "w";
    pub const SET_LINE_CAP: &str = "J";
    pub const SET_LINE_JOIN: &str = "j";
    pub const SET_MITER_LIMIT: &str = "M";
    pub const SET_DASH: &str = "d";
    pub const SET_RENDERING_INTENT: &str = "ri";
    pub const SET_FLATNESS: &str = "i";
    pub const APPLY_EXT_GSTATE: &str = "gs";

    // Special graphics state
    pub const SAVE_STATE: &str = "q";
    pub const RESTORE_STATE: &str = "Q";
    pub const CONCAT_MATRIX: &str = "cm";

    // Path construction
    pub const MOVE_TO: &str = "m";
    pub const LINE_TO: &str = "l";
    pub const CURVE_TO: &str = "c";
    pub const CURVE_TO_V: &str = "v";
    pub const CURVE_TO_Y: &str = "y";
    pub const CLOSE_SUBPATH: &str = "h";
    pub const RECTANGLE: &str = "re";

    // Path painting
    pub const STROKE: &str = "S";
    pub const CLOSE_STROKE: &str = "s";
    pub const FILL: &str = "f";
    pub const FILL_OBSOLETE: &str = "F";
    pub const FILL_EVEN_ODD: &str = "f*";
    pub const FILL_STROKE: &str = "B";
    pub const FILL_STROKE_EVEN_ODD: &str = "B*";
    pub const CLOSE_FILL_STROKE: &str = "b";
    pub const CLOSE_FILL_STROKE_EVEN_ODD: &str = "b*";
    pub const END_PATH: &str = "n";

    // Clipping
    pub const CLIP: &str = "W";
    pub const CLIP_EVEN_ODD: &str = "W*";

    // Text objects and state
    pub const BEGIN_TEXT: &str = "BT";
    pub const END_TEXT: &str = "ET";
    pub const SET_CHAR_SPACING: &str = "Tc";
    pub const SET_WORD_SPACING: &str = "Tw";
    pub const SET_HORIZONTAL_SCALING: &str = "Tz";
    pub const SET_LEADING: &str = "TL";
    pub const SET_FONT: &str = "Tf";
    pub const SET_RENDER_MODE: &str = "Tr";
    pub const SET_RISE: &str = "Ts";

    // Text positioning and showing
    pub const MOVE_TEXT: &str = "Td";
    pub const MOVE_TEXT_SET_LEADING: &str = "TD";
    pub const SET_TEXT_MATRIX: &str = "Tm";
    pub const NEXT_LINE: &str = "T*";
    pub const SHOW_TEXT: &str = "Tj";
    pub const SHOW_TEXT_ARRAY: &str = "TJ";
    pub const NEXT_LINE_SHOW_TEXT: &str = "'";
    pub const NEXT_LINE_SPACING_SHOW_TEXT: &str = "\"";

    // Color
    pub const SET_STROKE_COLOR_SPACE: &str = "CS";
    pub const SET_FILL_COLOR_SPACE: &str = "cs";
    pub const SET_STROKE_COLOR: &str = "SC";
    pub const SET_STROKE_COLOR_N: &str = "SCN";
    pub const SET_FILL_COLOR: &str = "sc";
    pub const SET_FILL_COLOR_N: &str = "scn";
    pub const SET_STROKE_GRAY: &str = "G";
    pub const SET_FILL_GRAY: &str = "g";
    pub const SET_STROKE_RGB: &str = "RG";
    pub const SET_FILL_RGB: &str = "rg";
    pub const SET_STROKE_CMYK: &str = "K";
    pub const SET_FILL_CMYK: &str = "k";

    // XObjects, shadings, inline images
    pub const PAINT_XOBJECT: &str = "Do";
    pub const PAINT_SHADING: &str = "sh";
    pub const BEGIN_INLINE_IMAGE: &str = "BI";
    pub const BEGIN_INLINE_IMAGE_DATA: &str = "ID";
    pub const END_INLINE_IMAGE: &str = "EI";

    // Marked content
    pub const BEGIN_MARKED_CONTENT: &str = "BMC";
    pub const BEGIN_MARKED_CONTENT_PROPS: &str = "BDC";
    pub const END_MARKED_CONTENT: &str = "EMC";
    pub const MARKED_POINT: &str = "MP";
    pub const MARKED_POINT_PROPS: &str = "DP";
}

use operators::*;

/// One operator with its operands, in stream order.
///
/// Unknown operators and unexpected operand counts are kept as-is; typed
/// accessors report mismatches as [`ContentError::MalformedOperand`].
#[derive(Debug, Clone, PartialEq)]
pub struct Operation {
    pub operator: String,
    pub operands: Vec<Object>,
}

impl Operation {
    pub fn new(operator: impl Into<String>, operands: Vec<Object>) -> Self {
        Self {
            operator: operator.into(),
            operands,
        }
    }

    pub fn is(&self, operator: &str) -> bool {
        self.operator == operator
    }

    pub fn is_path_construction(&self) -> bool {
        matches!(
            self.operator.as_str(),
            MOVE_TO | LINE_TO | CURVE_TO | CURVE_TO_V | CURVE_TO_Y | CLOSE_SUBPATH | RECTANGLE
        )
    }

    pub fn is_path_painting(&self) -> bool {
        matches!(
            self.operator.as_str(),
            STROKE
                | CLOSE_STROKE
                | FILL
                | FILL_OBSOLETE
                | FILL_EVEN_ODD
                | FILL_STROKE
                | FILL_STROKE_EVEN_ODD
                | CLOSE_FILL_STROKE
                | CLOSE_FILL_STROKE_EVEN_ODD
                | END_PATH
        )
    }

    pub fn is_clipping(&self) -> bool {
        matches!(self.operator.as_str(), CLIP | CLIP_EVEN_ODD)
    }

    /// Operations that may continue an open path.
    pub fn continues_path(&self) -> bool {
        self.is_path_construction() || self.is_path_painting() || self.is_clipping()
    }

    /// Operations that open a path object.
    pub fn starts_path(&self) -> bool {
        matches!(self.operator.as_str(), MOVE_TO | RECTANGLE)
    }

    fn malformed(&self, index: usize, expected: &'static str) -> ContentError {
        ContentError::MalformedOperand {
            operator: self.operator.clone(),
            index,
            expected,
        }
    }

    pub fn operand(&self, index: usize) -> Result<&Object, ContentError> {
        self.operands
            .get(index)
            .ok_or_else(|| self.malformed(index, "operand"))
    }

    pub fn number(&self, index: usize) -> Result<f64, ContentError> {
        self.operand(index)?
            .as_real()
            .ok_or_else(|| self.malformed(index, "number"))
    }

    pub fn integer(&self, index: usize) -> Result<i64, ContentError> {
        self.operand(index)?
            .as_integer()
            .ok_or_else(|| self.malformed(index, "integer"))
    }

    pub fn name(&self, index: usize) -> Result<&str, ContentError> {
        self.operand(index)?
            .as_name()
            .ok_or_else(|| self.malformed(index, "name"))
    }

    pub fn string(&self, index: usize) -> Result<&PdfString, ContentError> {
        self.operand(index)?
            .as_string()
            .ok_or_else(|| self.malformed(index, "string"))
    }

    pub fn array(&self, index: usize) -> Result<&[Object], ContentError> {
        self.operand(index)?
            .as_array()
            .map(Vec::as_slice)
            .ok_or_else(|| self.malformed(index, "array"))
    }

    /// All operands as numbers.
    pub fn numbers(&self) -> Result<Vec<f64>, ContentError> {
        (0..self.operands.len()).map(|i| self.number(i)).collect()
    }

    /// Six numeric operands starting at `index`, as for `cm` and `Tm`.
    pub fn matrix(&self, index: usize) -> Result<Matrix, ContentError> {
        let mut m = [0.0; 6];
        for (offset, slot) in m.iter_mut().enumerate() {
            *slot = self.number(index + offset)?;
        }
        Ok(Matrix::new(m[0], m[1], m[2], m[3], m[4], m[5]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classification() {
        let re = Operation::new(RECTANGLE, vec![]);
        assert!(re.starts_path());
        assert!(re.continues_path());
        assert!(Operation::new(CLIP, vec![]).continues_path());
        assert!(Operation::new(FILL_EVEN_ODD, vec![]).is_path_painting());
        assert!(!Operation::new(SHOW_TEXT, vec![]).continues_path());
    }

    #[test]
    fn test_typed_operands() {
        let op = Operation::new(
            SET_FONT,
            vec![Object::name("F1"), Object::Integer(12)],
        );
        assert_eq!(op.name(0).unwrap(), "F1");
        assert_eq!(op.number(1).unwrap(), 12.0);
        assert_eq!(op.integer(1).unwrap(), 12);

        match op.number(0) {
            Err(ContentError::MalformedOperand {
                operator,
                index,
                expected,
            }) => {
                assert_eq!(operator, "Tf");
                assert_eq!(index, 0);
                assert_eq!(expected, "number");
            }
            other => panic!("unexpected {other:?}"),
        }
        assert!(op.name(5).is_err());
    }

    #[test]
    fn test_matrix_operands() {
        let op = Operation::new(
            CONCAT_MATRIX,
            vec![2.into(), 0.into(), 0.into(), 2.into(), 10.into(), Object::Real(5.5)],
        );
        assert_eq!(op.matrix(0).unwrap(), Matrix::new(2.0, 0.0, 0.0, 2.0, 10.0, 5.5));
        let short = Operation::new(CONCAT_MATRIX, vec![1.into()]);
        assert!(short.matrix(0).is_err());
    }
}
