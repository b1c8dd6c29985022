mod support;

use medialibrary::{MediaError, MediaRepository, Storage};
use support::{png_bytes, public_options, seed_media, test_library};

#[tokio::test]
async fn test_copy_creates_independent_record() {
    let test = test_library(public_options());
    let original = seed_media(&test, "photo.png", png_bytes(10, 10)).await;

    let copy = test
        .library
        .copy_media_to_disk(&original, "archive")
        .await
        .unwrap();

    assert_eq!(copy.id, Some(2));
    assert_ne!(copy.uuid, original.uuid);
    assert_eq!(copy.disk, "archive");
    assert_eq!(copy.file_name, original.file_name);
    assert_eq!(copy.mime_type, original.mime_type);
    assert_eq!(copy.size, original.size);

    assert_eq!(
        test.archive.object("2/photo.png").unwrap().data,
        png_bytes(10, 10)
    );
    // The source is untouched.
    assert!(test.public.object("1/photo.png").is_some());
    assert!(test.repository.find_by_id(1).await.unwrap().is_some());
}

#[tokio::test]
async fn test_copy_does_not_carry_derived_files() {
    let test = test_library(public_options());
    let mut original = seed_media(&test, "photo.png", png_bytes(10, 10)).await;
    test.library
        .perform_conversions(&mut original, &["thumbnail"])
        .await
        .unwrap();

    let copy = test
        .library
        .copy_media_to_disk(&original, "archive")
        .await
        .unwrap();

    // The index travels with the record, the file does not.
    assert!(copy.has_generated_conversion("thumbnail"));
    let copy_conversion = test
        .library
        .paths()
        .path_for_conversion(&copy, "thumbnail")
        .unwrap();
    assert_eq!(copy_conversion, "2/thumbnail/conversions/photo-thumbnail.png");
    assert!(!test.public.exists(&copy_conversion).await.unwrap());
    assert!(!test.archive.exists(&copy_conversion).await.unwrap());
}

#[tokio::test]
async fn test_copy_requires_source_object() {
    let test = test_library(public_options());
    let original = seed_media(&test, "photo.png", png_bytes(10, 10)).await;
    test.public.delete("1/photo.png").await.unwrap();

    let result = test.library.copy_media_to_disk(&original, "archive").await;

    assert!(matches!(result, Err(MediaError::MissingObject { .. })));
    assert_eq!(test.repository.len().await, 1);
}

#[tokio::test]
async fn test_copy_to_unknown_disk_fails() {
    let test = test_library(public_options());
    let original = seed_media(&test, "photo.png", png_bytes(10, 10)).await;

    let result = test.library.copy_media_to_disk(&original, "nowhere").await;

    assert!(matches!(result, Err(MediaError::Storage(_))));
    assert_eq!(test.repository.len().await, 1);
}

#[tokio::test]
async fn test_move_relocates_and_cleans_up() {
    let test = test_library(public_options());
    let mut original = seed_media(&test, "photo.png", png_bytes(10, 10)).await;
    test.library
        .perform_conversions(&mut original, &["thumbnail"])
        .await
        .unwrap();
    let before = test.public.object("1/photo.png").unwrap().data;

    let moved = test
        .library
        .move_media_to_disk(&original, "archive")
        .await
        .unwrap();

    assert_ne!(moved.id, original.id);
    assert_ne!(moved.uuid, original.uuid);
    assert_eq!(moved.disk, "archive");
    assert_eq!(moved.mime_type, "image/png");
    assert_eq!(test.archive.object("2/photo.png").unwrap().data, before);

    assert!(!test.public.exists("1/photo.png").await.unwrap());
    assert!(
        !test
            .public
            .exists("1/thumbnail/conversions/photo-thumbnail.png")
            .await
            .unwrap()
    );
    assert!(test.repository.find_by_id(1).await.unwrap().is_none());
    assert!(test.repository.find_by_id(2).await.unwrap().is_some());
}

#[tokio::test]
async fn test_move_detects_mime_from_content() {
    let test = test_library(public_options());
    let mut original = seed_media(&test, "export.bin", png_bytes(3, 3)).await;
    original.mime_type = "application/x-stale".to_string();

    let moved = test
        .library
        .move_media_to_disk(&original, "archive")
        .await
        .unwrap();

    assert_eq!(moved.mime_type, "image/png");
}

#[tokio::test]
async fn test_delete_removes_files_and_record() {
    let test = test_library(public_options().with_conversions_disk("archive"));
    let mut media = seed_media(&test, "photo.png", png_bytes(10, 10)).await;
    test.library
        .perform_conversions(&mut media, &["thumbnail", "preview"])
        .await
        .unwrap();
    assert_eq!(test.archive.len(), 2);

    test.library.delete_media(&media).await.unwrap();

    assert!(test.public.is_empty());
    assert!(test.archive.is_empty());
    assert!(test.repository.is_empty().await);
}
