//! Page tree traversal, inheritance and insertion on nested nodes

mod common;

use common::PdfBuilder;
use pdfweave::document::Page;
use pdfweave::geometry::{PageFormat, Point, Rectangle, Rotation};
use pdfweave::{File, ObjectId, Result, WriterConfig};

/// Root with one direct page and an intermediate node holding two pages.
fn nested_tree() -> Vec<u8> {
    PdfBuilder::new("1.5")
        .object(1, "<< /Type /Catalog /Pages 2 0 R >>")
        .object(2, "<< /Type /Pages /Kids [3 0 R 4 0 R] /Count 3 /MediaBox [0 0 612 792] >>")
        .object(3, "<< /Type /Page /Parent 2 0 R >>")
        .object(4, "<< /Type /Pages /Parent 2 0 R /Kids [5 0 R 6 0 R] /Count 2 /Rotate 90 >>")
        .object(5, "<< /Type /Page /Parent 4 0 R /MediaBox [0 0 100 200] >>")
        .object(6, "<< /Type /Page /Parent 4 0 R /Rotate -90 >>")
        .xref("/Size 7 /Root 1 0 R")
        .finish()
}

fn id(number: u32) -> ObjectId {
    ObjectId::new(number, 0)
}

#[test]
fn test_leaves_in_document_order() -> Result<()> {
    let mut file = File::from_bytes(nested_tree())?;
    let mut document = file.document();
    let mut pages = document.pages()?;
    assert_eq!(pages.count()?, 3);
    assert_eq!(pages.ids()?, vec![id(3), id(5), id(6)]);
    assert_eq!(pages.get(3)?, None);
    Ok(())
}

#[test]
fn test_attributes_inherit_through_nodes() -> Result<()> {
    let mut file = File::from_bytes(nested_tree())?;
    let objects = file.objects_mut();

    let direct = Page::new(id(3));
    assert_eq!(direct.media_box(objects)?, PageFormat::Letter.to_rectangle());
    assert_eq!(direct.rotation(objects)?, Rotation::Up);

    let own_box = Page::new(id(5));
    assert_eq!(
        own_box.media_box(objects)?,
        Rectangle::new(Point::new(0.0, 0.0), Point::new(100.0, 200.0))
    );
    assert_eq!(own_box.rotation(objects)?, Rotation::Right);

    let overridden = Page::new(id(6));
    assert_eq!(overridden.rotation(objects)?, Rotation::Left);
    assert_eq!(overridden.media_box(objects)?, PageFormat::Letter.to_rectangle());
    Ok(())
}

#[test]
fn test_add_to_nested_node_updates_ancestor_counts() -> Result<()> {
    let mut file = File::from_bytes(nested_tree())?;
    let added = file
        .document()
        .pages()?
        .add_to(id(4), Page::create(PageFormat::A5.to_rectangle()))?;

    let bytes = file.to_bytes(&WriterConfig::incremental())?;
    let mut reloaded = File::from_bytes(bytes)?;

    let intermediate = reloaded.objects_mut().get_data(id(4))?;
    assert_eq!(intermediate.as_dict().unwrap().get_integer("Count"), Some(3));

    let mut document = reloaded.document();
    let mut pages = document.pages()?;
    assert_eq!(pages.count()?, 4);
    assert_eq!(pages.ids()?, vec![id(3), id(5), id(6), added.id()]);

    let page = pages.get(3)?.unwrap();
    let dict = page.dictionary(reloaded.objects_mut())?;
    assert_eq!(dict.get_reference("Parent"), Some(id(4)));
    assert_eq!(page.rotation(reloaded.objects_mut())?, Rotation::Right);
    Ok(())
}

#[test]
fn test_add_to_root_of_new_file() -> Result<()> {
    let mut file = File::new();
    let first = file.document().pages()?.add(Page::create(PageFormat::A4.to_rectangle()))?;
    let second = file.document().pages()?.add(Page::create(PageFormat::Letter.to_rectangle()))?;

    let mut reloaded = File::from_bytes(file.to_bytes(&WriterConfig::default())?)?;
    let mut document = reloaded.document();
    let mut pages = document.pages()?;
    assert_eq!(pages.count()?, 2);
    assert_eq!(pages.ids()?.len(), 2);
    assert_ne!(first.id(), second.id());
    Ok(())
}
