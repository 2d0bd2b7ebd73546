#![cfg(feature = "rustface")]

use std::fs::File;
use std::path::PathBuf;

use shore::rustface_backend::create_face_engine;
use shore::{ColorSpace, Engine, FaceEngineConfig, Frame, Info, ModelType, RustfaceEngine};

fn model_path() -> Option<PathBuf> {
    let path = std::env::var_os("SEETA_MODEL")
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("demos/seeta_fd_frontal_v1.0.bin"));
    if path.exists() {
        Some(path)
    } else {
        None
    }
}

#[test]
fn blank_frame_has_no_faces() {
    let Some(model) = model_path() else {
        eprintln!("Skipping test: SeetaFace model not found");
        return;
    };

    let config = FaceEngineConfig {
        time_base: 0.04,
        update_time_base: false,
        ..FaceEngineConfig::default()
    };
    let mut engine = create_face_engine(&model, config).expect("Failed to load model");

    let pixels = vec![128u8; 64 * 48 * 3];
    let frame = Frame::interleaved(&pixels, 64, 48).unwrap();
    let content = engine.process(&frame, ColorSpace::Rgb).unwrap();

    assert_eq!(content.num_objects(), 0);
    assert_eq!(content.infos().get("FrameRate").unwrap(), Info::Number(25.0));

    engine.close();
    assert!(engine.is_closed());
}

#[test]
fn model_loads_from_reader() {
    let Some(model) = model_path() else {
        eprintln!("Skipping test: SeetaFace model not found");
        return;
    };

    let reader = File::open(&model).unwrap();
    let raw = RustfaceEngine::from_reader(reader, FaceEngineConfig::default()).expect("Failed to read model");
    let mut engine = Engine::new(raw);

    let pixels = vec![0u8; 32 * 32];
    let frame = Frame::gray(&pixels, 32, 32).unwrap();
    assert_eq!(engine.process(&frame, ColorSpace::Grayscale).unwrap().num_objects(), 0);
}

#[test]
fn profile_model_is_rejected() {
    let config = FaceEngineConfig {
        model_type: ModelType::FaceProfile,
        ..FaceEngineConfig::default()
    };
    assert!(create_face_engine("does-not-matter.bin", config).is_err());
}
