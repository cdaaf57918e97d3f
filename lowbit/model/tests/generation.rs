mod common;

use common::{runtime, write_checkpoint, write_checkpoint_without, PROMPT, VOCAB};
use lowbit_hub::{HubApi, HubError};
use lowbit_model::{
    BaichuanProvider, Dtype, GenerationConfig, ModelError, ModelHandle, ModelProvider,
    QuantizationParams, RuntimeParams, MANIFEST_FILE, WEIGHTS_FILE,
};

fn fresh(
    dir: &std::path::Path,
    quant: &QuantizationParams,
    rt: &RuntimeParams,
) -> lowbit_model::LowBitModel {
    BaichuanProvider::default()
        .construct_fresh(dir.to_str().unwrap(), quant, rt)
        .unwrap()
}

// ── greedy decoding ─────────────────────────────────────────────────

#[test]
fn generation_is_deterministic_and_keeps_prompt() {
    let dir = tempfile::tempdir().unwrap();
    write_checkpoint(dir.path(), 7, 2);
    let model = fresh(dir.path(), &QuantizationParams::default(), &runtime(2, 2, true));

    let gen = GenerationConfig::greedy(8);
    let a = model.generate(PROMPT, &gen).unwrap();
    let b = model.generate(PROMPT, &gen).unwrap();
    assert_eq!(a, b);
    assert_eq!(&a[..PROMPT.len()], PROMPT);
    assert!(a.len() > PROMPT.len() && a.len() <= PROMPT.len() + 8);
    assert!(a.iter().all(|&id| (id as usize) < VOCAB));
}

#[test]
fn zero_new_tokens_returns_prompt() {
    let dir = tempfile::tempdir().unwrap();
    write_checkpoint(dir.path(), 7, 2);
    let model = fresh(dir.path(), &QuantizationParams::default(), &runtime(1, 1, false));
    assert_eq!(model.generate(PROMPT, &GenerationConfig::greedy(0)).unwrap(), PROMPT);
}

#[test]
fn execution_layout_does_not_change_output() {
    let dir = tempfile::tempdir().unwrap();
    write_checkpoint(dir.path(), 11, 2);
    let quant = QuantizationParams::default();
    let gen = GenerationConfig::greedy(12);

    let baseline = fresh(dir.path(), &quant, &runtime(1, 1, false)).generate(PROMPT, &gen).unwrap();
    for (intra, inter, transpose) in [(2, 1, false), (1, 3, false), (4, 2, true), (3, 3, true)] {
        let out = fresh(dir.path(), &quant, &runtime(intra, inter, transpose))
            .generate(PROMPT, &gen)
            .unwrap();
        assert_eq!(out, baseline, "intra_pp={} inter_pp={} transpose={}", intra, inter, transpose);
    }
}

#[test]
fn fused_mlp_matches_split_mlp() {
    let dir = tempfile::tempdir().unwrap();
    write_checkpoint(dir.path(), 5, 2);
    let gen = GenerationConfig::greedy(10);
    let fused = fresh(dir.path(), &QuantizationParams::default(), &runtime(2, 2, true));
    let split = fresh(
        dir.path(),
        &QuantizationParams { optimize_model: false, ..Default::default() },
        &runtime(2, 2, true),
    );
    assert_eq!(fused.generate(PROMPT, &gen).unwrap(), split.generate(PROMPT, &gen).unwrap());
}

#[test]
fn stops_at_eos_and_includes_it() {
    let reference_dir = tempfile::tempdir().unwrap();
    write_checkpoint(reference_dir.path(), 3, 2);
    let quant = QuantizationParams::default();
    let reference = fresh(reference_dir.path(), &quant, &runtime(1, 1, true));
    let first = *reference.generate(PROMPT, &GenerationConfig::greedy(1)).unwrap().last().unwrap();

    // Same weights, but the first greedy token is now the end-of-sequence id.
    let dir = tempfile::tempdir().unwrap();
    write_checkpoint(dir.path(), 3, first);
    let model = fresh(dir.path(), &quant, &runtime(1, 1, true));
    let out = model.generate(PROMPT, &GenerationConfig::greedy(10)).unwrap();
    assert_eq!(out.len(), PROMPT.len() + 1);
    assert_eq!(*out.last().unwrap(), first);
}

#[test]
fn output_never_exceeds_max_output_len() {
    let dir = tempfile::tempdir().unwrap();
    // eos outside the vocabulary: generation only stops on length
    write_checkpoint(dir.path(), 9, VOCAB as u32);
    let rt = RuntimeParams { max_output_len: 10, max_prompt_len: 8, ..runtime(1, 1, true) };
    let model = fresh(dir.path(), &QuantizationParams::default(), &rt);
    let out = model.generate(PROMPT, &GenerationConfig::greedy(100)).unwrap();
    assert_eq!(out.len(), 10);
}

// ── lowbit persistence ──────────────────────────────────────────────

#[test]
fn persist_then_load_reproduces_output() {
    let dir = tempfile::tempdir().unwrap();
    let src = dir.path().join("src");
    let cache = dir.path().join("lowbit");
    write_checkpoint(&src, 21, 2);

    for quant in [
        QuantizationParams::default(),
        QuantizationParams { dtype: Dtype::F32, optimize_model: false, ..Default::default() },
    ] {
        let _ = std::fs::remove_dir_all(&cache);
        let gen = GenerationConfig::greedy(10);
        let model = fresh(&src, &quant, &runtime(2, 2, true));
        let expected = model.generate(PROMPT, &gen).unwrap();
        model.persist(&cache).unwrap();

        assert!(cache.join(MANIFEST_FILE).is_file());
        assert!(cache.join("config.json").is_file());
        assert!(cache.join(WEIGHTS_FILE).is_file());

        let loaded = BaichuanProvider::default()
            .load_cached(&cache, &runtime(1, 3, false))
            .unwrap();
        assert_eq!(loaded.quantization(), &quant);
        assert_eq!(loaded.config(), model.config());
        assert_eq!(loaded.config().num_hidden_layers, 3);
        assert_eq!(loaded.plan().stages(), &[0..1, 1..2, 2..3]);
        assert_eq!(model.plan().stages(), &[0..2, 2..3]);
        assert_eq!(model.plan().shards(), 2);
        assert_eq!(loaded.generate(PROMPT, &gen).unwrap(), expected);
    }
}

#[test]
fn load_cached_without_directory_fails() {
    let dir = tempfile::tempdir().unwrap();
    let result =
        BaichuanProvider::default().load_cached(&dir.path().join("missing"), &runtime(1, 1, true));
    assert!(matches!(result, Err(ModelError::IoError(_))));
}

// ── error cases ─────────────────────────────────────────────────────

#[test]
fn rejects_invalid_generation_requests() {
    let dir = tempfile::tempdir().unwrap();
    write_checkpoint(dir.path(), 1, 2);
    let model = fresh(dir.path(), &QuantizationParams::default(), &runtime(1, 1, true));

    let too_long: Vec<u32> = vec![5; 17];
    assert!(matches!(
        model.generate(&too_long, &GenerationConfig::greedy(4)),
        Err(ModelError::GenerationError(_))
    ));
    assert!(model.generate(&[], &GenerationConfig::greedy(4)).is_err());
    assert!(model.generate(&[1, VOCAB as u32], &GenerationConfig::greedy(4)).is_err());

    let beams = GenerationConfig { num_beams: 4, ..GenerationConfig::greedy(4) };
    assert!(matches!(model.generate(PROMPT, &beams), Err(ModelError::Unsupported(_))));
    let sampling = GenerationConfig { do_sample: true, ..GenerationConfig::greedy(4) };
    assert!(matches!(model.generate(PROMPT, &sampling), Err(ModelError::Unsupported(_))));
}

#[test]
fn rejects_invalid_runtime_params() {
    let dir = tempfile::tempdir().unwrap();
    write_checkpoint(dir.path(), 1, 2);
    let provider = BaichuanProvider::default();
    let source = dir.path().to_str().unwrap();
    let quant = QuantizationParams::default();

    let past_positions = RuntimeParams { max_output_len: 4096, ..runtime(1, 1, true) };
    assert!(matches!(
        provider.construct_fresh(source, &quant, &past_positions),
        Err(ModelError::InvalidConfig(_))
    ));
    assert!(provider.construct_fresh(source, &quant, &runtime(1, 4, true)).is_err());
    assert!(provider.construct_fresh(source, &quant, &runtime(0, 1, true)).is_err());
}

#[test]
fn missing_tensor_is_reported() {
    let dir = tempfile::tempdir().unwrap();
    write_checkpoint_without(dir.path(), 1, 2, Some("model.layers.1.mlp.up_proj.weight"));
    let result = BaichuanProvider::default().construct_fresh(
        dir.path().to_str().unwrap(),
        &QuantizationParams::default(),
        &runtime(1, 1, true),
    );
    match result {
        Err(ModelError::MissingTensor(name)) => {
            assert_eq!(name, "model.layers.1.mlp.up_proj.weight")
        }
        Err(other) => panic!("unexpected error: {}", other),
        Ok(_) => panic!("expected a missing tensor error"),
    }
}

#[test]
fn pytorch_only_checkpoint_is_rejected_before_loading() {
    let dir = tempfile::tempdir().unwrap();
    write_checkpoint(dir.path(), 1, 2);
    let weights = dir.path().join("model.safetensors");
    std::fs::rename(&weights, dir.path().join("pytorch_model.bin")).unwrap();

    let provider = BaichuanProvider::new(HubApi::new());
    let result = provider.construct_fresh(
        dir.path().to_str().unwrap(),
        &QuantizationParams::default(),
        &runtime(1, 1, true),
    );
    match result {
        Err(ModelError::HubError(HubError::UnsupportedFormat(msg))) => {
            assert!(msg.contains("pytorch_model.bin"), "{}", msg);
            assert!(msg.contains("SafeTensors"), "{}", msg);
        }
        Err(other) => panic!("unexpected error: {}", other),
        Ok(_) => panic!("expected an unsupported format error"),
    }
}
