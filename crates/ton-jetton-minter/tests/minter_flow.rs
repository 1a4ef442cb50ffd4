//! End-to-end flow: artifacts and config on disk, deploy, mint, query.

use std::fs;
use std::sync::Arc;

use ton_cell::{BagOfCells, Cell, CellBuilder, CellSlice, MsgAddress};
use ton_jetton_minter::{
    ContractCodes, ContractProvider, GetMethodResult, JettonConfig, JettonMinter, MockProvider,
    OP_INTERNAL_TRANSFER, OP_MINT, SendMode, StackEntry, MINT_MESSAGE_VALUE,
};

const OWNER: &str = "0:1111111111111111111111111111111111111111111111111111111111111111";

fn code_cell(tag: u32) -> Arc<Cell> {
    let mut builder = CellBuilder::new();
    builder.store_u32(tag).unwrap();
    Arc::new(builder.build().unwrap())
}

fn write_artifact(dir: &std::path::Path, name: &str, cell: Arc<Cell>) {
    let hex = BagOfCells::new(vec![cell]).serialize_to_hex().unwrap();
    fs::write(dir.join(name), format!(r#"{{"hex": "{}"}}"#, hex)).unwrap();
}

#[test]
fn deploy_mint_and_query() {
    let dir = tempfile::tempdir().unwrap();
    write_artifact(dir.path(), "jetton-minter.compiled.json", code_cell(0x1001));
    write_artifact(dir.path(), "jetton-wallet.compiled.json", code_cell(0x2002));

    let config_path = dir.path().join("jetton.json");
    fs::write(
        &config_path,
        format!(
            r#"{{
                "owner": "{}",
                "name": "Flow Token",
                "symbol": "FLOW",
                "description": "",
                "decimals": 9,
                "image": "https://example.com/flow.png"
            }}"#,
            OWNER
        ),
    )
    .unwrap();

    let codes = ContractCodes::load_from_dir(dir.path()).unwrap();
    assert_eq!(codes.minter.hash(), code_cell(0x1001).hash());

    let config = JettonConfig::load(&config_path).unwrap();
    let owner = MsgAddress::from_string(OWNER).unwrap();
    assert_eq!(config.owner, owner);

    let minter =
        JettonMinter::create_from_config(&config, codes.minter.cell(), codes.wallet.cell(), 0)
            .unwrap();
    let init = minter.init().unwrap().clone();
    assert_eq!(minter.address().workchain(), Some(0));

    let provider = MockProvider::new();
    minter.send_deploy(&provider, 50_000_000).unwrap();
    minter.send_mint(&provider, &owner, 1_000_000_000).unwrap();

    let sent = provider.sent_messages();
    assert_eq!(sent.len(), 2);
    assert_eq!(sent[0].state_init.as_ref(), Some(&init));
    assert_eq!(sent[1].value, MINT_MESSAGE_VALUE);
    assert_eq!(sent[1].send_mode, SendMode::PAY_GAS_SEPARATELY);
    for message in &sent {
        message.to_cell().unwrap();
    }

    let mut body = CellSlice::new(&sent[1].body);
    assert_eq!(body.load_u32().unwrap(), OP_MINT);
    body.load_u64().unwrap();
    assert_eq!(body.load_address().unwrap(), owner);
    body.load_coins().unwrap();
    let mut transfer = CellSlice::new(body.load_ref().unwrap());
    assert_eq!(transfer.load_u32().unwrap(), OP_INTERNAL_TRANSFER);

    // The minter's data cell is what get_jetton_data reports back.
    let mut data = CellSlice::new(&init.data);
    data.load_coins().unwrap();
    data.load_address().unwrap();
    let content = Arc::new(data.load_ref().unwrap().clone());
    let wallet_code = Arc::new(data.load_ref().unwrap().clone());

    let mut provider = provider;
    provider.set_result(
        "get_jetton_data",
        GetMethodResult::success(vec![
            StackEntry::Int(1_000_000_000),
            StackEntry::Int(-1),
            StackEntry::address_slice(&owner).unwrap(),
            StackEntry::Cell(content),
            StackEntry::Cell(wallet_code),
        ]),
    );
    let wallet = MsgAddress::Internal {
        workchain: 0,
        address: [0x77; 32],
    };
    provider.set_result(
        "get_wallet_address",
        GetMethodResult::success(vec![StackEntry::address_slice(&wallet).unwrap()]),
    );

    let jetton = minter.get_jetton_data(&provider).unwrap();
    assert_eq!(jetton.total_supply, 1_000_000_000);
    assert!(jetton.mintable);
    assert_eq!(jetton.admin_address, owner);
    assert_eq!(jetton.wallet_code.as_ref().unwrap().hash(), codes.wallet.hash());

    let metadata = jetton.metadata().unwrap().unwrap();
    assert_eq!(metadata.name.as_deref(), Some("Flow Token"));
    assert_eq!(metadata.symbol.as_deref(), Some("FLOW"));
    assert_eq!(metadata.decimals.as_deref(), Some("9"));
    assert_eq!(metadata.image.as_deref(), Some("https://example.com/flow.png"));
    assert_eq!(metadata.description, None);
    assert_eq!(metadata.uri, None);

    assert_eq!(minter.get_wallet_address(&provider, &owner).unwrap(), wallet);
    assert_eq!(provider.get_method_calls().len(), 2);
}

#[test]
fn provider_by_reference() {
    fn deploy_with(provider: impl ContractProvider, minter: &JettonMinter) {
        minter.send_deploy(&provider, 1).unwrap();
    }

    let provider = MockProvider::new();
    let minter = JettonMinter::create_from_address(MsgAddress::from_string(OWNER).unwrap());
    deploy_with(&provider, &minter);
    assert_eq!(provider.sent_messages().len(), 1);
}

#[test]
fn missing_artifact_is_io_error() {
    let dir = tempfile::tempdir().unwrap();
    assert!(matches!(
        ContractCodes::load_from_dir(dir.path()),
        Err(ton_jetton_minter::JettonError::Io(_))
    ));
}
