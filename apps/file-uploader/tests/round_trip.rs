//! End-to-end uploads against an in-process receiver

use std::io::Cursor;
use std::path::{Path, PathBuf};

use file_receiver::config::StorageConfig;
use file_uploader::{Config, UploadClient, UploadError};
use tempfile::TempDir;
use tokio::sync::oneshot;

struct Receiver {
    root: TempDir,
    port: u16,
    _shutdown: oneshot::Sender<()>,
}

impl Receiver {
    async fn start() -> Self {
        let root = TempDir::new().unwrap();
        let mut config = file_receiver::Config::default();
        config.storage = StorageConfig {
            image_dir: root.path().join("images"),
            video_dir: root.path().join("videos"),
        };

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let (tx, rx) = oneshot::channel::<()>();
        let state = file_receiver::AppState::new(config);

        tokio::spawn(async move {
            file_receiver::server::serve(listener, state, async {
                rx.await.ok();
            })
            .await
            .unwrap();
        });

        Self {
            root,
            port,
            _shutdown: tx,
        }
    }

    fn client(&self) -> UploadClient {
        let mut config = Config::default();
        config.server.ip_address = "127.0.0.1".to_string();
        config.server.port = self.port;
        UploadClient::new(&config).unwrap()
    }

    fn video(&self, name: &str) -> PathBuf {
        self.root.path().join("videos").join(name)
    }

    fn image(&self, name: &str) -> PathBuf {
        self.root.path().join("images").join(name)
    }
}

fn write_file(dir: &Path, name: &str, data: &[u8]) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, data).unwrap();
    path
}

fn patterned(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i * 31 % 256) as u8).collect()
}

fn png_bytes() -> Vec<u8> {
    let img = image::RgbaImage::from_fn(17, 9, |x, y| {
        image::Rgba([x as u8 * 15, y as u8 * 28, (x + y) as u8, 255])
    });
    let mut out = Vec::new();
    image::DynamicImage::ImageRgba8(img)
        .write_to(&mut Cursor::new(&mut out), image::ImageFormat::Png)
        .unwrap();
    out
}

#[tokio::test]
async fn test_multipart_upload_persists_every_file() {
    let receiver = Receiver::start().await;
    let src = TempDir::new().unwrap();

    let small = patterned(10);
    let large = patterned(3 * 16 * 1024 + 5);
    let png = png_bytes();
    let files = vec![
        write_file(src.path(), "a.mp4", &small),
        write_file(src.path(), "big.mp4", &large),
        write_file(src.path(), "b.png", &png),
    ];

    let response = receiver.client().upload_multipart(&files).await.unwrap();

    assert_eq!(response.status.as_u16(), 200);
    assert_eq!(response.body, "OK");

    // Videos come back byte for byte
    assert_eq!(std::fs::read(receiver.video("a.mp4")).unwrap(), small);
    assert_eq!(std::fs::read(receiver.video("big.mp4")).unwrap(), large);

    // Images come back pixel for pixel
    let saved = image::open(receiver.image("b.png")).unwrap().to_rgba8();
    let original = image::load_from_memory(&png).unwrap().to_rgba8();
    assert_eq!(saved.as_raw(), original.as_raw());
}

#[tokio::test]
async fn test_multipart_uses_basename_of_full_path() {
    let receiver = Receiver::start().await;
    let src = TempDir::new().unwrap();
    let nested = src.path().join("deep").join("er");
    std::fs::create_dir_all(&nested).unwrap();
    let path = write_file(&nested, "clip.mp4", b"clip");

    // The part name and filename carry the whole absolute path
    let response = receiver.client().upload_multipart(&[path]).await.unwrap();

    assert_eq!(response.body, "OK");
    assert_eq!(std::fs::read(receiver.video("clip.mp4")).unwrap(), b"clip".to_vec());
}

#[tokio::test]
async fn test_multipart_missing_file_sends_nothing() {
    let receiver = Receiver::start().await;
    let src = TempDir::new().unwrap();
    let present = write_file(src.path(), "a.mp4", b"data");

    let result = receiver
        .client()
        .upload_multipart(&[present, src.path().join("missing.mp4")])
        .await;

    assert!(matches!(result, Err(UploadError::FileNotFound { .. })));
    assert!(!receiver.video("a.mp4").exists());
}

#[tokio::test]
async fn test_put_byte_counts_match_file_sizes() {
    let receiver = Receiver::start().await;
    let src = TempDir::new().unwrap();

    let sizes = [0usize, 1, 16 * 1024, 16 * 1024 + 1, 5 * 16 * 1024 + 77];
    let files: Vec<PathBuf> = sizes
        .iter()
        .map(|&size| write_file(src.path(), &format!("file {}.bin", size), &patterned(size)))
        .collect();

    let outcomes = receiver.client().upload_raw(&files).await;

    assert_eq!(outcomes.len(), sizes.len());
    for (outcome, &size) in outcomes.iter().zip(sizes.iter()) {
        let response = outcome.result.as_ref().unwrap();
        assert_eq!(response.status.as_u16(), 200);
        assert_eq!(response.body, "OK");
        assert_eq!(response.received_bytes, Some(size as u64));
    }
}

#[tokio::test]
async fn test_put_image_acknowledged() {
    let receiver = Receiver::start().await;
    let src = TempDir::new().unwrap();
    let png = png_bytes();
    let path = write_file(src.path(), "b.png", &png);

    let outcomes = receiver.client().upload_raw(&[path]).await;
    let response = outcomes[0].result.as_ref().unwrap();

    assert_eq!(response.body, "OK");
    assert_eq!(response.received_bytes, Some(png.len() as u64));
}

#[tokio::test]
async fn test_put_continues_after_failed_file() {
    let receiver = Receiver::start().await;
    let src = TempDir::new().unwrap();
    let present = write_file(src.path(), "after.mp4", b"12345");

    let outcomes = receiver
        .client()
        .upload_raw(&[src.path().join("missing.mp4"), present])
        .await;

    assert!(matches!(
        outcomes[0].result,
        Err(UploadError::FileNotFound { .. })
    ));
    assert_eq!(outcomes[1].result.as_ref().unwrap().received_bytes, Some(5));
}

#[tokio::test]
async fn test_response_body_ceiling() {
    let receiver = Receiver::start().await;
    let src = TempDir::new().unwrap();
    let path = write_file(src.path(), "a.mp4", b"data");

    let result = receiver
        .client()
        .with_max_response_body(1)
        .upload_multipart(&[path])
        .await;

    assert!(matches!(result, Err(UploadError::ResponseTooLarge { limit: 1 })));
}
