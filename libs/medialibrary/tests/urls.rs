mod support;

use medialibrary::{MediaRecord, TransformOptions, Transformer};
use std::{sync::Arc, time::Duration};
use support::{
    PUBLIC_BASE_URL, png_bytes, public_options, seed_media, test_library, test_library_with,
};

#[tokio::test]
async fn test_original_url_uses_disk_base_url() {
    let test = test_library(public_options());
    let media = seed_media(&test, "photo.png", png_bytes(10, 10)).await;

    assert_eq!(
        test.library.url_for_media(&media),
        format!("{}/1/photo.png", PUBLIC_BASE_URL)
    );
}

#[tokio::test]
async fn test_missing_conversion_resolves_to_empty() {
    let test = test_library(public_options());
    let media = seed_media(&test, "photo.png", png_bytes(10, 10)).await;

    assert_eq!(test.library.url_for_conversion(&media, "nonexistent"), "");
    assert_eq!(test.library.url_for_responsive_image(&media, "responsive", 320), "");
}

#[tokio::test]
async fn test_generated_conversion_url() {
    let test = test_library(public_options());
    let mut media = seed_media(&test, "photo.png", png_bytes(10, 10)).await;
    test.library
        .perform_conversions(&mut media, &["thumbnail"])
        .await
        .unwrap();

    assert_eq!(
        test.library.url_for_conversion(&media, "thumbnail"),
        format!(
            "{}/1/thumbnail/conversions/photo-thumbnail.png",
            PUBLIC_BASE_URL
        )
    );
}

#[tokio::test]
async fn test_responsive_urls_follow_the_index() {
    let transformer = medialibrary::ImageTransformer::with_defaults();
    transformer.register_responsive_recipe("cards", vec![8, 4], TransformOptions::new());
    let test = test_library_with(public_options(), Arc::new(transformer));
    let mut media = seed_media(&test, "photo.png", png_bytes(16, 16)).await;
    test.library
        .generate_responsive_images(&mut media, &["cards"])
        .await
        .unwrap();

    assert_eq!(
        test.library.url_for_responsive_image(&media, "cards", 4),
        format!(
            "{}/1/cards/responsive-images/photo-cards-4.png",
            PUBLIC_BASE_URL
        )
    );
    assert_eq!(test.library.url_for_responsive_image(&media, "cards", 16), "");

    let widths: Vec<u32> = test
        .library
        .responsive_image_urls(&media, "cards")
        .into_iter()
        .map(|(width, _)| width)
        .collect();
    assert_eq!(widths, vec![4, 8]);
}

#[tokio::test]
async fn test_urls_never_fail() {
    let test = test_library(public_options());

    let unsaved = MediaRecord::new("photo.png", "public");
    assert_eq!(test.library.url_for_media(&unsaved), "");

    let mut elsewhere = seed_media(&test, "photo.png", png_bytes(10, 10)).await;
    elsewhere.disk = "nowhere".to_string();
    elsewhere.conversions_disk = "nowhere".to_string();
    elsewhere.mark_conversion_generated("thumbnail");
    assert_eq!(test.library.url_for_media(&elsewhere), "");
    assert_eq!(test.library.url_for_conversion(&elsewhere, "thumbnail"), "");
}

#[tokio::test]
async fn test_disk_without_base_url_gives_empty_url() {
    let test = test_library(public_options());
    let media = seed_media(&test, "photo.png", png_bytes(10, 10)).await;
    let copy = test
        .library
        .copy_media_to_disk(&media, "archive")
        .await
        .unwrap();

    assert_eq!(test.library.url_for_media(&copy), "");
}

#[tokio::test]
async fn test_temporary_url_falls_back_to_public_url() {
    let test = test_library(public_options());
    let media = seed_media(&test, "photo.png", png_bytes(10, 10)).await;

    let url = test
        .library
        .temporary_url_for_media(&media, Duration::from_secs(300))
        .await
        .unwrap();
    assert_eq!(url, test.library.url_for_media(&media));

    let unsaved = MediaRecord::new("photo.png", "public");
    assert!(
        test.library
            .temporary_url_for_media(&unsaved, Duration::from_secs(300))
            .await
            .is_err()
    );
}
