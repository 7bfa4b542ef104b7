// Derivation & signing benchmarks for the zkLogin pipeline.
//
// Covers nonce derivation, salt and address derivation, transaction digests,
// and composite signature encoding. None of these touch the network; they
// are the per-login and per-transaction local costs.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

use foresight_auth::crypto::keys::EphemeralKeypair;
use foresight_auth::transaction::TransactionBuilder;
use foresight_auth::zklogin::prover::{IssBase64Details, ProofPoints};
use foresight_auth::zklogin::{
    derive_address, derive_nonce, transaction_digest, CompositeSignature, DerivedSaltProvider,
    Randomness, ZkLoginInputs, ZkLoginSignature,
};

const ISS: &str = "https://accounts.google.com";
const AUD: &str = "client-123.apps.googleusercontent.com";

fn bench_nonce(c: &mut Criterion) {
    let keypair = EphemeralKeypair::from_seed(&[7u8; 32]);
    let public_key = keypair.public_key();
    let randomness = Randomness::from_u128(0x0123_4567_89ab_cdef_0123_4567_89ab_cdef);

    c.bench_function("zklogin/derive_nonce", |b| {
        b.iter(|| derive_nonce(black_box(&public_key), black_box(812), &randomness));
    });
}

fn bench_salt_and_address(c: &mut Criterion) {
    let provider = DerivedSaltProvider::new([9u8; 32]);

    c.bench_function("zklogin/derive_salt", |b| {
        b.iter(|| provider.derive(ISS, AUD, black_box("110169484474386276334")));
    });

    let salt = provider.derive(ISS, AUD, "110169484474386276334");
    c.bench_function("zklogin/derive_address", |b| {
        b.iter(|| {
            derive_address(ISS, "sub", black_box("110169484474386276334"), AUD, &salt).unwrap()
        });
    });
}

fn bench_transaction_digest(c: &mut Criterion) {
    let mut group = c.benchmark_group("zklogin/transaction_digest");

    for size in [64usize, 512, 4096] {
        let bytes = vec![0xA5u8; size];
        group.throughput(Throughput::Bytes(size as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), &bytes, |b, bytes| {
            b.iter(|| transaction_digest(bytes));
        });
    }

    group.finish();
}

fn bench_composite_signature(c: &mut Criterion) {
    let keypair = EphemeralKeypair::from_seed(&[7u8; 32]);
    let salt = DerivedSaltProvider::new([9u8; 32]).derive(ISS, AUD, "user-1");
    let (address, seed) = derive_address(ISS, "sub", "user-1", AUD, &salt).unwrap();

    let inputs = ZkLoginInputs {
        proof_points: ProofPoints {
            a: vec!["1".into(), "2".into(), "1".into()],
            b: vec![
                vec!["3".into(), "4".into()],
                vec!["5".into(), "6".into()],
                vec!["1".into(), "0".into()],
            ],
            c: vec!["7".into(), "8".into(), "1".into()],
        },
        iss_base64_details: IssBase64Details {
            value: "yJpc3MiOiJodHRwczovL2FjY291bnRzLmdvb2dsZS5jb20iLC".into(),
            index_mod4: 1,
        },
        header_base64: "eyJhbGciOiJSUzI1NiJ9".into(),
        address_seed: seed.as_str().to_string(),
    };

    c.bench_function("zklogin/sign_and_encode", |b| {
        b.iter(|| {
            let tx = TransactionBuilder::place_bet("0xmarket", 1, 250)
                .sender(address.as_str())
                .nonce(42)
                .build();
            let digest = transaction_digest(&tx.signable_bytes());
            let signature = keypair.sign(&digest);
            let body = ZkLoginSignature {
                inputs: inputs.clone(),
                max_epoch: 812,
                user_signature: signature.to_serialized(&keypair.public_key()),
            };
            CompositeSignature::encode(&body).unwrap()
        });
    });
}

criterion_group!(
    benches,
    bench_nonce,
    bench_salt_and_address,
    bench_transaction_digest,
    bench_composite_signature,
);
criterion_main!(benches);
