//! Content stream parsing and scanning against real page objects

mod common;

use common::{one_page_pdf, PdfBuilder};
use pdfweave::content::{
    Color, CompositeKind, ContentObject, GraphicsState, ScanHandler,
};
use pdfweave::geometry::{Matrix, Point};
use pdfweave::{Contents, File, Object, Operation, ParseError, Result};

fn first_page(file: &mut File) -> Result<pdfweave::Page> {
    let mut document = file.document();
    let mut pages = document.pages()?;
    let page = pages.get(0)?;
    Ok(page.expect("one page"))
}

#[test]
fn test_inline_image_with_embedded_terminator() {
    let mut content = b"q BI /W 7 /H 1 /BPC 8 /CS /G ID ".to_vec();
    content.extend_from_slice(&[0xFF, 0xD8, 0x20, 0x45, 0x49, 0x20, 0xAA]);
    content.extend_from_slice(b" EI Q");

    let contents = Contents::parse(&content).unwrap();
    let state = contents.objects()[0].as_composite().unwrap();
    match &state.objects[0].as_composite().unwrap().kind {
        CompositeKind::InlineImage(image) => {
            assert_eq!(image.data, vec![0xFF, 0xD8, 0x20, 0x45, 0x49, 0x20, 0xAA]);
            assert_eq!(image.width(), Some(7));
        }
        other => panic!("expected an inline image, got {other:?}"),
    }
}

#[test]
fn test_unterminated_inline_image_fails() {
    let result = Contents::parse(b"BI /W 1 /H 1 ID \x00\x01");
    assert!(matches!(result, Err(ParseError::UnterminatedInlineImage { .. })));
}

#[test]
fn test_flush_keeps_operator_sequence() {
    let source = b"q\r\n0.5 0 0 0.5 10 10 cm /GS0 gs\n0 0 m 10 0 l 10 10 l h f*\nBT /F1 12 Tf (Hi) Tj ET Q\n/P <</MCID 3>> BDC EMC";
    let contents = Contents::parse(source).unwrap();
    let reparsed = Contents::parse(&contents.to_bytes()).unwrap();
    assert_eq!(reparsed, contents);
}

#[test]
fn test_page_scan_applies_ext_gstate() -> Result<()> {
    let mut file = File::from_bytes(one_page_pdf(b"q /GS0 gs 1 0 0 RG Q 2 0 0 2 0 0 cm"))?;
    let page = first_page(&mut file)?;
    let context = page.content_context(file.objects_mut())?;

    let mut scanner = context.scanner();
    assert!(scanner.move_first()?);
    {
        let child = scanner.child_level().unwrap();
        child.move_end()?;
        assert_eq!(child.state().line_width, 6.0);
        assert_eq!(child.state().fill_alpha, 0.5);
        assert_eq!(child.state().stroke_color, Color::Rgb(1.0, 0.0, 0.0));
    }
    scanner.move_end()?;
    assert_eq!(scanner.state().line_width, 1.0);
    assert_eq!(scanner.state().ctm, Matrix::scale(2.0, 2.0));
    Ok(())
}

#[test]
fn test_child_ctm_changes_stay_in_child() -> Result<()> {
    let mut file = File::from_bytes(one_page_pdf(b"q 1 0 0 1 100 100 cm Q"))?;
    let page = first_page(&mut file)?;
    let context = page.content_context(file.objects_mut())?;

    let mut scanner = context.scanner_for_canvas(612.0, 792.0);
    assert!(scanner.move_first()?);
    let parent_ctm = scanner.state().ctm;
    {
        let child = scanner.child_level().unwrap();
        child.move_end()?;
        assert_ne!(child.state().ctm, parent_ctm);
    }
    assert_eq!(scanner.state().ctm, parent_ctm);
    scanner.move_end()?;
    assert_eq!(scanner.state().ctm, parent_ctm);
    Ok(())
}

#[derive(Default)]
struct TextOrigins {
    origins: Vec<Point>,
}

impl ScanHandler for TextOrigins {
    fn operation(&mut self, op: &Operation, state: &GraphicsState) {
        if op.is("Tj") {
            let device = state.text_matrix.concat(&state.ctm);
            self.origins.push(device.transform_point(Point::origin()));
        }
    }
}

#[test]
fn test_form_xobject_is_scanned_with_its_matrix() -> Result<()> {
    let form = b"BT 5 0 Td (f) Tj ET";
    let bytes = PdfBuilder::new("1.4")
        .object(1, "<< /Type /Catalog /Pages 2 0 R >>")
        .object(2, "<< /Type /Pages /Kids [3 0 R] /Count 1 >>")
        .object(
            3,
            "<< /Type /Page /Parent 2 0 R /MediaBox [0 0 200 200] /Resources << /XObject << /Fm0 5 0 R >> >> /Contents 4 0 R >>",
        )
        .stream(4, b"BT 1 0 0 1 10 20 Tm (p) Tj ET 1 0 0 1 50 0 cm /Fm0 Do")
        .object(
            5,
            &format!(
                "<< /Type /XObject /Subtype /Form /BBox [0 0 10 10] /Matrix [2 0 0 2 0 0] /Length {} >>\nstream\n{}\nendstream",
                form.len(),
                String::from_utf8_lossy(form)
            ),
        )
        .xref("/Size 6 /Root 1 0 R")
        .finish();

    let mut file = File::from_bytes(bytes)?;
    let page = first_page(&mut file)?;
    let context = page.content_context(file.objects_mut())?;
    assert!(context.resources.form("Fm0").is_some());

    let mut origins = TextOrigins::default();
    context.scanner().render(&mut origins)?;
    assert_eq!(
        origins.origins,
        vec![Point::new(10.0, 20.0), Point::new(60.0, 0.0)]
    );
    Ok(())
}

#[test]
fn test_edit_through_page_contents() -> Result<()> {
    let mut file = File::from_bytes(one_page_pdf(b"0 g 0 0 10 10 re f"))?;
    let page = first_page(&mut file)?;

    let mut contents = page.contents(file.objects_mut())?;
    assert!(matches!(&contents.objects()[1], ContentObject::Composite(c) if c.kind == CompositeKind::Path));
    contents.remove(1);
    contents.push(Operation::new("w", vec![Object::Integer(4)]));
    page.set_contents(file.objects_mut(), &contents)?;

    let saved = file.to_bytes(&pdfweave::WriterConfig::incremental())?;
    let mut reloaded = File::from_bytes(saved)?;
    let page = first_page(&mut reloaded)?;
    let reloaded_contents = page.contents(reloaded.objects_mut())?;
    assert_eq!(reloaded_contents, contents);
    Ok(())
}
