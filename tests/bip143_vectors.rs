//! BIP-143 reference transactions: sighash intermediates and signing

use consensus_script::script::checker::p2wpkh_script_code;
use consensus_script::script::stream::{compile_push_bytes, find_and_delete};
use consensus_script::sighash::SegwitSighashCache;
use consensus_script::*;
use num_bigint::BigUint;

const NATIVE_P2WPKH_UNSIGNED: &str = "0100000002fff7f7881a8099afa6940d42d1e7f6362bec38171ea3edf433541db4e4ad969f0000000000eeffffffef51e1b804cc89d182d279655c3aa89e815b1b309fe287d9b2b55d57b90ec68a0100000000ffffffff02202cb206000000001976a9148280b37df378db99f66f85c95a783a76ac7a6d5988ac9093510d000000001976a9143bde42dbee7e4dbe6a21b2d50ce2f0167faa815988ac11000000";
const NATIVE_P2WPKH_SIGNED: &str = "01000000000102fff7f7881a8099afa6940d42d1e7f6362bec38171ea3edf433541db4e4ad969f00000000494830450221008b9d1dc26ba6a9cb62127b02742fa9d754cd3bebf337f7a55d114c8e5cdd30be022040529b194ba3f9281a99f2b1c0a19c0489bc22ede944ccf4ecbab4cc618ef3ed01eeffffffef51e1b804cc89d182d279655c3aa89e815b1b309fe287d9b2b55d57b90ec68a0100000000ffffffff02202cb206000000001976a9148280b37df378db99f66f85c95a783a76ac7a6d5988ac9093510d000000001976a9143bde42dbee7e4dbe6a21b2d50ce2f0167faa815988ac000247304402203609e17b84f6a7d30c80bfa610b5b4542f32a8a0d5447a12fb1366d7f01cc44a0220573a954c4518331561406f90300e8f3358f51928d43c212a8caed02de67eebee0121025476c2e83188368da1ff3e292e7acafcdb3566bb0ad253f62fc70f07aeee635711000000";

const P2SH_P2WPKH_UNSIGNED: &str = "0100000001db6b1b20aa0fd7b23880be2ecbd4a98130974cf4748fb66092ac4d3ceb1a54770100000000feffffff02b8b4eb0b000000001976a914a457b684d7f0d539a46a45bbc043f35b59d0d96388ac0008af2f000000001976a914fd270b1ee6abcaea97fea7ad0402e8bd8ad6d77c88ac92040000";
const P2SH_P2WPKH_SIGNED: &str = "01000000000101db6b1b20aa0fd7b23880be2ecbd4a98130974cf4748fb66092ac4d3ceb1a5477010000001716001479091972186c449eb1ded22b78e40d009bdf0089feffffff02b8b4eb0b000000001976a914a457b684d7f0d539a46a45bbc043f35b59d0d96388ac0008af2f000000001976a914fd270b1ee6abcaea97fea7ad0402e8bd8ad6d77c88ac02473044022047ac8e878352d3ebbde1c94ce3a10d057c24175747116f8288e5d794d12d482f0220217f36a485cae903c713331d877c1f64677e3622ad4010726870540656fe9dcb012103ad1d8e89212f0b92c74d23bb710c00662ad1470198ac48c43f7d6f93a2a2687392040000";

const CODESEP_P2WSH_UNSIGNED: &str = "0100000002fe3dc9208094f3ffd12645477b3dc56f60ec4fa8e6f5d67c565d1c6b9216b36e0000000000ffffffff0815cf020f013ed6cf91d29f4202e8a58726b1ac6c79da47c23d1bee0a6925f80000000000ffffffff0100f2052a010000001976a914a30741f8145e5acadf23f751864167f32e0963f788ac00000000";
const CODESEP_P2WSH_SIGNED: &str = "01000000000102fe3dc9208094f3ffd12645477b3dc56f60ec4fa8e6f5d67c565d1c6b9216b36e000000004847304402200af4e47c9b9629dbecc21f73af989bdaa911f7e6f6c2e9394588a3aa68f81e9902204f3fcf6ade7e5abb1295b6774c8e0abd94ae62217367096bc02ee5e435b67da201ffffffff0815cf020f013ed6cf91d29f4202e8a58726b1ac6c79da47c23d1bee0a6925f80000000000ffffffff0100f2052a010000001976a914a30741f8145e5acadf23f751864167f32e0963f788ac000347304402200de66acf4527789bfda55fc5459e214fa6083f936b430a762c629656216805ac0220396f550692cd347171cbc1ef1f51e15282e837bb2b30860dc77c8f78bc8501e503473044022027dc95ad6b740fe5129e7e62a75dd00f291a2aeb1200b84b09d9e3789406b6c002201a9ecd315dd6a0e632ab20bbb98948bc0c6fb204f2c286963bb48517a7058e27034721026dccc749adc2a9d0d89497ac511f760f45c47dc5ed9cf352a58ac706453880aeadab210255a9626aebf5e29c0e6538428ba0d1dcf6ca98ffdf086aa8ced5e0d0215ea465ac00000000";
const CODESEP_WITNESS_SCRIPT: &str = "21026dccc749adc2a9d0d89497ac511f760f45c47dc5ed9cf352a58ac706453880aeadab210255a9626aebf5e29c0e6538428ba0d1dcf6ca98ffdf086aa8ced5e0d0215ea465ac";

const UNEXECUTED_CODESEP_UNSIGNED: &str = "0100000002e9b542c5176808107ff1df906f46bb1f2583b16112b95ee5380665ba7fcfc0010000000000ffffffff80e68831516392fcd100d186b3c2c7b95c80b53c77e77c35ba03a66b429a2a1b0000000000ffffffff0280969800000000001976a914de4b231626ef508c9a74a8517e6783c0546d6b2888ac80969800000000001976a9146648a8cd4531e1ec47f35916de8e259237294d1e88ac00000000";
const UNEXECUTED_CODESEP_SIGNED: &str = "01000000000102e9b542c5176808107ff1df906f46bb1f2583b16112b95ee5380665ba7fcfc0010000000000ffffffff80e68831516392fcd100d186b3c2c7b95c80b53c77e77c35ba03a66b429a2a1b0000000000ffffffff0280969800000000001976a914de4b231626ef508c9a74a8517e6783c0546d6b2888ac80969800000000001976a9146648a8cd4531e1ec47f35916de8e259237294d1e88ac02483045022100f6a10b8604e6dc910194b79ccfc93e1bc0ec7c03453caaa8987f7d6c3413566002206216229ede9b4d6ec2d325be245c5b508ff0339bf1794078e20bfe0babc7ffe683270063ab68210392972e2eb617b2388771abe27235fd5ac44af8e61693261550447a4c3e39da98ac024730440220032521802a76ad7bf74d0e2c218b72cf0cbc867066e2e53db905ba37f130397e02207709e2188ed7f08f4c952d9d13986da504502b8c3be59617e043552f506c46ff83275163ab68210392972e2eb617b2388771abe27235fd5ac44af8e61693261550447a4c3e39da98ac00000000";

const MULTISIG_6_OF_6_UNSIGNED: &str = "010000000136641869ca081e70f394c6948e8af409e18b619df2ed74aa106c1ca29787b96e0100000000ffffffff0200e9a435000000001976a914389ffce9cd9ae88dcc0631e88a821ffdbe9bfe2688acc0832f05000000001976a9147480a33f950689af511e6e84c138dbbd3c3ee41588ac00000000";
const MULTISIG_6_OF_6_SIGNED: &str = "0100000000010136641869ca081e70f394c6948e8af409e18b619df2ed74aa106c1ca29787b96e0100000023220020a16b5755f7f6f96dbd65f5f0d6ab9418b89af4b1f14a1bb8a09062c35f0dcb54ffffffff0200e9a435000000001976a914389ffce9cd9ae88dcc0631e88a821ffdbe9bfe2688acc0832f05000000001976a9147480a33f950689af511e6e84c138dbbd3c3ee41588ac080047304402206ac44d672dac41f9b00e28f4df20c52eeb087207e8d758d76d92c6fab3b73e2b0220367750dbbe19290069cba53d096f44530e4f98acaa594810388cf7409a1870ce01473044022068c7946a43232757cbdf9176f009a928e1cd9a1a8c212f15c1e11ac9f2925d9002205b75f937ff2f9f3c1246e547e54f62e027f64eefa2695578cc6432cdabce271502473044022059ebf56d98010a932cf8ecfec54c48e6139ed6adb0728c09cbe1e4fa0915302e022007cd986c8fa870ff5d2b3a89139c9fe7e499259875357e20fcbb15571c76795403483045022100fbefd94bd0a488d50b79102b5dad4ab6ced30c4069f1eaa69a4b5a763414067e02203156c6a5c9cf88f91265f5a942e96213afae16d83321c8b31bb342142a14d16381483045022100a5263ea0553ba89221984bd7f0b13613db16e7a70c549a86de0cc0444141a407022005c360ef0ae5a5d4f9f2f87a56c1546cc8268cab08c73501d6b3be2e1e1a8a08824730440220525406a1482936d5a21888260dc165497a90a15669636d8edca6b9fe490d309c022032af0c646a34a44d1f4576bf6a4a74b67940f8faa84c7df9abe12a01a11e2b4783cf56210307b8ae49ac90a048e9b53357a2354b3334e9c8bee813ecb98e99a7e07e8c3ba32103b28f0c28bfab54554ae8c658ac5c3e0ce6e79ad336331f78c428dd43eea8449b21034b8113d703413d57761b8b9781957b8c0ac1dfe69f492580ca4195f50376ba4a21033400f6afecb833092a9a21cfdf1ed1376e58c5d1f47de74683123987e967a8f42103a6d48b1131e94ba04d9737d61acdaa1322008af9602b3b14862c07a1789aac162102d8b661b0b3302ee2f162b09e07a55ad5dfbe673a9f01d9f0c19617681024306b56ae00000000";
const MULTISIG_6_OF_6_REDEEM: &str = "0020a16b5755f7f6f96dbd65f5f0d6ab9418b89af4b1f14a1bb8a09062c35f0dcb54";
const MULTISIG_6_OF_6_WITNESS_SCRIPT: &str = "56210307b8ae49ac90a048e9b53357a2354b3334e9c8bee813ecb98e99a7e07e8c3ba32103b28f0c28bfab54554ae8c658ac5c3e0ce6e79ad336331f78c428dd43eea8449b21034b8113d703413d57761b8b9781957b8c0ac1dfe69f492580ca4195f50376ba4a21033400f6afecb833092a9a21cfdf1ed1376e58c5d1f47de74683123987e967a8f42103a6d48b1131e94ba04d9737d61acdaa1322008af9602b3b14862c07a1789aac162102d8b661b0b3302ee2f162b09e07a55ad5dfbe673a9f01d9f0c19617681024306b56ae";

const NO_FIND_AND_DELETE_UNSIGNED: &str = "010000000169c12106097dc2e0526493ef67f21269fe888ef05c7a3a5dacab38e1ac8387f14c1d000000ffffffff0101000000000000000000000000";
const NO_FIND_AND_DELETE_SIGNED: &str = "0100000000010169c12106097dc2e0526493ef67f21269fe888ef05c7a3a5dacab38e1ac8387f14c1d000000ffffffff01010000000000000000034830450220487fb382c4974de3f7d834c1b617fe15860828c7f96454490edd6d891556dcc9022100baf95feb48f845d5bfc9882eb6aeefa1bc3790e39f59eaa46ff7f15ae626c53e012102a9781d66b61fb5a7ef00ac5ad5bc6ffc78be7b44a566e3c87870e1079368df4c4aad4830450220487fb382c4974de3f7d834c1b617fe15860828c7f96454490edd6d891556dcc9022100baf95feb48f845d5bfc9882eb6aeefa1bc3790e39f59eaa46ff7f15ae626c53e0100000000";
const NO_FIND_AND_DELETE_SIGNATURE: &str = "30450220487fb382c4974de3f7d834c1b617fe15860828c7f96454490edd6d891556dcc9022100baf95feb48f845d5bfc9882eb6aeefa1bc3790e39f59eaa46ff7f15ae626c53e01";

fn secret(hex_digits: &str) -> BigUint {
    BigUint::parse_bytes(hex_digits.as_bytes(), 16).unwrap()
}

fn bytes(hex_digits: &str) -> Vec<u8> {
    hex::decode(hex_digits).unwrap()
}

fn native_p2wpkh_tx() -> Tx {
    let mut tx = Tx::from_hex(NATIVE_P2WPKH_UNSIGNED).unwrap();
    tx.set_unspents(vec![
        Some(TxOut::new(
            625_000_000,
            bytes("2103c9f4836b9a4f77fc0d81f7bcb01b7f1b35916864b9476c241ce9fc198bd25432ac"),
        )),
        Some(TxOut::new(600_000_000, bytes("00141d0f172a0ecb48aee1be1f2687d2963ae33f71a1"))),
    ])
    .unwrap();
    tx
}

fn p2sh_p2wpkh_tx() -> Tx {
    let mut tx = Tx::from_hex(P2SH_P2WPKH_UNSIGNED).unwrap();
    tx.set_unspents(vec![Some(TxOut::new(
        1_000_000_000,
        bytes("a9144733f37cf4db86fbc2efed2500b4f4e49f31202387"),
    ))])
    .unwrap();
    tx
}

#[test]
fn test_native_p2wpkh_sighash_parts() {
    let tx = native_p2wpkh_tx();
    let cache = SegwitSighashCache::new(&tx);
    assert_eq!(
        hex::encode(cache.hash_prevouts()),
        "96b827c8483d4e9b96712b6713a7b68d6e8003a781feba36c31143470b4efd37"
    );
    assert_eq!(
        hex::encode(cache.hash_sequence()),
        "52b0a642eea2fb7ae638c36f6252b6750293dbe574a806984b8e4d8548339a3b"
    );
    assert_eq!(
        hex::encode(cache.hash_outputs()),
        "863ef3e1a92afbfdb97f31ad0fc7683ee943e9abcf2501590ff8f6551f47e5e5"
    );

    let script_code = p2wpkh_script_code(&bytes("1d0f172a0ecb48aee1be1f2687d2963ae33f71a1"));
    assert_eq!(
        hex::encode(cache.signature_hash(&script_code, 1, 600_000_000, SIGHASH_ALL)),
        "c37af31116d1b27caf68aae9e3ac82f1477929014d5b917657d0eb49478cb670"
    );
}

#[test]
fn test_native_p2wpkh_signing() {
    let engine = ScriptEngine::new().with_flags(ScriptFlags::STANDARD);
    let secrets = [
        secret("bbc27228ddcb9209d7fd6f36b02f7dfa6252af40bb2f1cbc7a557da8027ff866"),
        secret("619c335025c7f4012e556c2a58b2506e30b8511b53ade95ea316fd8c3286feb9"),
    ];
    let keys = KeyStore::from_secret_exponents(engine.curve(), &secrets).unwrap();

    let mut tx = native_p2wpkh_tx();
    assert_eq!(engine.bad_solution_count(&tx), 2);
    assert_eq!(engine.sign_tx(&mut tx, &keys, &()), 0);
    assert_eq!(tx.to_hex(), NATIVE_P2WPKH_SIGNED);
    assert!(tx.is_solution_ok(engine.curve(), 0, ScriptFlags::STANDARD));
    assert!(tx.is_solution_ok(engine.curve(), 1, ScriptFlags::STANDARD));
}

#[test]
fn test_native_p2wpkh_signed_form_parses_and_verifies() {
    let engine = ScriptEngine::new().with_flags(ScriptFlags::STANDARD);
    let mut tx = Tx::from_hex(NATIVE_P2WPKH_SIGNED).unwrap();
    assert!(tx.has_witness_data());
    assert_eq!(tx.to_hex(), NATIVE_P2WPKH_SIGNED);
    tx.set_unspents(native_p2wpkh_tx().unspents).unwrap();
    assert!(engine.verify_tx(&tx).is_ok());

    // the witness signature commits to the amount being spent
    tx.unspents[1].as_mut().unwrap().coin_value -= 1;
    assert!(engine.verify_input(&tx, 0).is_ok());
    assert!(engine.verify_input(&tx, 1).is_err());
}

#[test]
fn test_p2sh_p2wpkh_sighash_parts() {
    let tx = p2sh_p2wpkh_tx();
    let cache = SegwitSighashCache::new(&tx);
    assert_eq!(
        hex::encode(cache.hash_prevouts()),
        "b0287b4a252ac05af83d2dcef00ba313af78a3e9c329afa216eb3aa2a7b4613a"
    );
    assert_eq!(
        hex::encode(cache.hash_sequence()),
        "18606b350cd8bf565266bc352f0caddcf01e8fa789dd8a15386327cf8cabe198"
    );
    assert_eq!(
        hex::encode(cache.hash_outputs()),
        "de984f44532e2173ca0d64314fcefe6d30da6f8cf27bafa706da61df8a226c83"
    );
    let script_code = p2wpkh_script_code(&bytes("79091972186c449eb1ded22b78e40d009bdf0089"));
    assert_eq!(
        hex::encode(cache.signature_hash(&script_code, 0, 1_000_000_000, SIGHASH_ALL)),
        "64f3b0f4dd2bb3aa1ce8566d220cc74dda9df97d8490cc81d89d735c92e59fb6"
    );
}

#[test]
fn test_p2sh_p2wpkh_signing() {
    let engine = ScriptEngine::new().with_flags(ScriptFlags::STANDARD);
    let secrets = [secret("eb696a065ef48a2192da5b28b694f87544b30fae8327c4510137a922f32c6dcf")];
    let keys = KeyStore::from_secret_exponents(engine.curve(), &secrets).unwrap();
    let scripts = ScriptStore::from_scripts([bytes("001479091972186c449eb1ded22b78e40d009bdf0089")]);

    let mut tx = p2sh_p2wpkh_tx();
    assert_eq!(engine.sign_tx(&mut tx, &keys, &()), 1);
    assert_eq!(tx.to_hex(), P2SH_P2WPKH_UNSIGNED);

    assert_eq!(engine.sign_tx(&mut tx, &keys, &scripts), 0);
    assert_eq!(tx.to_hex(), P2SH_P2WPKH_SIGNED);
    assert!(engine.verify_tx(&tx).is_ok());
}

#[test]
fn test_signing_is_idempotent() {
    let engine = ScriptEngine::new();
    let secrets = [secret("eb696a065ef48a2192da5b28b694f87544b30fae8327c4510137a922f32c6dcf")];
    let keys = KeyStore::from_secret_exponents(engine.curve(), &secrets).unwrap();
    let scripts = ScriptStore::from_scripts([bytes("001479091972186c449eb1ded22b78e40d009bdf0089")]);

    let mut tx = p2sh_p2wpkh_tx();
    engine.sign_tx(&mut tx, &keys, &scripts);
    let once = tx.to_hex();
    // force a re-solve of an already valid input
    let solver = engine.solver(&keys, &scripts);
    tx.sign_input(&solver, 0).unwrap();
    assert_eq!(tx.to_hex(), once);
    engine.sign_tx(&mut tx, &keys, &scripts);
    assert_eq!(tx.to_hex(), once);
}

fn with_unspents(hex_tx: &str, unspents: Vec<TxOut>) -> Tx {
    let mut tx = Tx::from_hex(hex_tx).unwrap();
    tx.set_unspents(unspents.into_iter().map(Some).collect()).unwrap();
    tx
}

fn codesep_unspents() -> Vec<TxOut> {
    vec![
        TxOut::new(
            156_250_000,
            bytes("21036d5c20fa14fb2f635474c1dc4ef5909d4568e5569b79fc94d3448486e14685f8ac"),
        ),
        TxOut::new(
            4_900_000_000,
            bytes("00205d1b56b63d714eebe542309525f484b7e9d6f686b3781b6f61ef925d66d6f6a0"),
        ),
    ]
}

#[test]
fn test_p2wsh_script_code_starts_after_executed_separator() {
    let tx = with_unspents(CODESEP_P2WSH_UNSIGNED, codesep_unspents());
    let cache = SegwitSighashCache::new(&tx);
    let witness_script = bytes(CODESEP_WITNESS_SCRIPT);

    // first CHECKSIGVERIFY runs before the separator: the whole script,
    // separator included
    assert_eq!(
        hex::encode(cache.signature_hash(&witness_script, 1, 4_900_000_000, SIGHASH_SINGLE)),
        "82dde6e4f1e94d02c2b7ad03d2115d691f48d064e9d52f58194a6637e4194391"
    );
    // second CHECKSIG only covers what follows it
    assert_eq!(witness_script[35], 0xab);
    assert_eq!(
        hex::encode(cache.signature_hash(&witness_script[36..], 1, 4_900_000_000, SIGHASH_SINGLE)),
        "fef7bd749cce710c5c052bd796df1af0d935e59cea63736268bcbe2d2134fc47"
    );

    let engine = ScriptEngine::new();
    let mut signed = with_unspents(CODESEP_P2WSH_SIGNED, codesep_unspents());
    assert_eq!(signed.to_hex(), CODESEP_P2WSH_SIGNED);
    assert!(engine.verify_tx(&signed).is_ok());

    // SINGLE on input 1 has no output to commit to; ALL on input 0 does
    signed.txs_out[0].coin_value += 1;
    assert!(engine.verify_input(&signed, 0).is_err());
    assert!(engine.verify_input(&signed, 1).is_ok());
}

#[test]
fn test_unexecuted_separator_is_kept_in_script_code() {
    let unspents = vec![
        TxOut::new(
            16_777_215,
            bytes("0020ba468eea561b26301e4cf69fa34bde4ad60c81e70f059f045ca9a79931004a4d"),
        ),
        TxOut::new(
            16_777_215,
            bytes("0020d9bbfbe56af7c4b7f960a70d7ea107156913d9e5a26b0a71429df5e097ca6537"),
        ),
    ];
    let tx = with_unspents(UNEXECUTED_CODESEP_UNSIGNED, unspents.clone());
    let cache = SegwitSighashCache::new(&tx);
    let hash_type = SIGHASH_SINGLE | SIGHASH_ANYONECANPAY;

    // 0 IF CODESEPARATOR ENDIF <key> CHECKSIG
    let skipped = bytes("0063ab68210392972e2eb617b2388771abe27235fd5ac44af8e61693261550447a4c3e39da98ac");
    assert_eq!(
        hex::encode(cache.signature_hash(&skipped, 0, 16_777_215, hash_type)),
        "e9071e75e25b8a1e298a72f0d2e9f4f95a0f5cdf86a533cda597eb402ed13b3a"
    );
    // 1 IF CODESEPARATOR ENDIF <key> CHECKSIG
    let taken = bytes("5163ab68210392972e2eb617b2388771abe27235fd5ac44af8e61693261550447a4c3e39da98ac");
    assert_eq!(
        hex::encode(cache.signature_hash(&taken[3..], 1, 16_777_215, hash_type)),
        "cd72f1f1a433ee9df816857fad88d8ebd97e09a75cd481583eb841c330275e54"
    );

    let signed = with_unspents(UNEXECUTED_CODESEP_SIGNED, unspents);
    assert_eq!(signed.txs_in[0].witness[1], skipped);
    assert_eq!(signed.txs_in[1].witness[1], taken);
    let engine = ScriptEngine::new();
    assert!(engine.verify_tx(&signed).is_ok());
    assert_eq!(engine.bad_solution_count(&signed), 0);
}

fn multisig_6_of_6_unspent() -> Vec<TxOut> {
    vec![TxOut::new(987_654_321, bytes("a9149993a429037b5d912407a71c252019287b8d27a587"))]
}

#[test]
fn test_p2sh_p2wsh_6_of_6_every_hash_type() {
    let tx = with_unspents(MULTISIG_6_OF_6_UNSIGNED, multisig_6_of_6_unspent());
    let cache = SegwitSighashCache::new(&tx);
    let witness_script = bytes(MULTISIG_6_OF_6_WITNESS_SCRIPT);
    let expected = [
        (SIGHASH_ALL, "185c0be5263dce5b4bb50a047973c1b6272bfbd0103a89444597dc40b248ee7c"),
        (SIGHASH_NONE, "e9733bc60ea13c95c6527066bb975a2ff29a925e80aa14c213f686cbae5d2f36"),
        (SIGHASH_SINGLE, "1e1f1c303dc025bd664acb72e583e933fae4cff9148bf78c157d1e8f78530aea"),
        (
            SIGHASH_ALL | SIGHASH_ANYONECANPAY,
            "2a67f03e63a6a422125878b40b82da593be8d4efaafe88ee528af6e5a9955c6e",
        ),
        (
            SIGHASH_NONE | SIGHASH_ANYONECANPAY,
            "781ba15f3779d5542ce8ecb5c18716733a5ee42a6f51488ec96154934e2c890a",
        ),
        (
            SIGHASH_SINGLE | SIGHASH_ANYONECANPAY,
            "511e8e52ed574121fc1b654970395502128263f62662e076dc6baf05c2e6a99b",
        ),
    ];
    for (hash_type, digest) in expected {
        assert_eq!(
            hex::encode(cache.signature_hash(&witness_script, 0, 987_654_321, hash_type)),
            digest,
            "hash type {hash_type:#x}"
        );
    }

    let engine = ScriptEngine::new().with_flags(ScriptFlags::STANDARD);
    let signed = with_unspents(MULTISIG_6_OF_6_SIGNED, multisig_6_of_6_unspent());
    assert_eq!(signed.txs_in[0].script, compile_push_bytes(&bytes(MULTISIG_6_OF_6_REDEEM)));
    assert_eq!(signed.txs_in[0].witness.len(), 8);
    assert!(engine.verify_tx(&signed).is_ok());
}

#[test]
fn test_p2sh_p2wsh_6_of_6_signing() {
    let engine = ScriptEngine::new().with_flags(ScriptFlags::STANDARD);
    let secrets = [
        secret("730fff80e1413068a05b57d6a58261f07551163369787f349438ea38ca80fac6"),
        secret("11fa3d25a17cbc22b29c44a484ba552b5a53149d106d3d853e22fdd05a2d8bb3"),
        secret("77bf4141a87d55bdd7f3cd0bdccf6e9e642935fec45f2f30047be7b799120661"),
        secret("14af36970f5025ea3e8b5542c0f8ebe7763e674838d08808896b63c3351ffe49"),
        secret("fe9a95c19eef81dde2b95c1284ef39be497d128e2aa46916fb02d552485e0323"),
        secret("428a7aee9f0c2af0cd19af3cf1c78149951ea528726989b2e83e4778d2c3f890"),
    ];
    let keys = KeyStore::from_secret_exponents(engine.curve(), &secrets).unwrap();
    let scripts = ScriptStore::from_scripts([
        bytes(MULTISIG_6_OF_6_REDEEM),
        bytes(MULTISIG_6_OF_6_WITNESS_SCRIPT),
    ]);

    let mut tx = with_unspents(MULTISIG_6_OF_6_UNSIGNED, multisig_6_of_6_unspent());
    assert_eq!(engine.sign_tx(&mut tx, &keys, &scripts), 0);
    assert!(engine.verify_tx(&tx).is_ok());

    // deterministic signing reproduces the SIGHASH_ALL signature of the first key
    let reference = Tx::from_hex(MULTISIG_6_OF_6_SIGNED).unwrap();
    let witness = &tx.txs_in[0].witness;
    assert_eq!(witness.len(), 8);
    assert!(witness[0].is_empty());
    assert_eq!(witness[1], reference.txs_in[0].witness[1]);
    assert_eq!(witness[7], bytes(MULTISIG_6_OF_6_WITNESS_SCRIPT));
    assert_eq!(tx.hash(), reference.hash());
}

#[test]
fn test_segwit_does_not_find_and_delete() {
    let signature = bytes(NO_FIND_AND_DELETE_SIGNATURE);
    // CHECKSIGVERIFY <signature>
    let mut witness_script = vec![0xad];
    witness_script.extend_from_slice(&compile_push_bytes(&signature));
    let unspent = vec![TxOut::new(
        200_000,
        bytes("00209e1be07558ea5cc8e02ed1d80c0911048afad949affa36d5c3951e3159dbea19"),
    )];

    let tx = with_unspents(NO_FIND_AND_DELETE_UNSIGNED, unspent.clone());
    let cache = SegwitSighashCache::new(&tx);
    assert_eq!(
        hex::encode(cache.signature_hash(&witness_script, 0, 200_000, SIGHASH_ALL)),
        "71c9cd9b2869b9c70b01b1f0360c148f42dee72297db312638df136f43311f23"
    );
    // what a legacy script would have signed instead
    let (deleted, count) = find_and_delete(&witness_script, &compile_push_bytes(&signature));
    assert_eq!((deleted.as_slice(), count), (&[0xad][..], 1));
    assert_ne!(
        cache.signature_hash(&deleted, 0, 200_000, SIGHASH_ALL),
        cache.signature_hash(&witness_script, 0, 200_000, SIGHASH_ALL)
    );

    let signed = with_unspents(NO_FIND_AND_DELETE_SIGNED, unspent);
    assert_eq!(signed.txs_in[0].witness[2], witness_script);
    let engine = ScriptEngine::new();
    assert!(engine.verify_tx(&signed).is_ok());

    // the signature is high-S, which only policy rejects
    let strict = ScriptEngine::new().with_flags(ScriptFlags::DEFAULT | ScriptFlags::LOW_S);
    match strict.verify_tx(&signed) {
        Err(ConsensusError::Script(err)) => assert_eq!(err.kind, ScriptErrorKind::SigHighS),
        other => panic!("unexpected {other:?}"),
    }
}
