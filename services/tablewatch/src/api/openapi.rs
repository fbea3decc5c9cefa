//! OpenAPI schema aggregation for the bridge API.
use crate::api::{
    ai, bitables, config, records, system,
    types::{
        AiParseRequest, AiParseResponse, BitableItem, CompletionStatus, ConfigSavedResponse,
        CredentialCheckResponse, ErrorResponse, FieldItem, HealthStatus, InsertRecordRequest,
        InsertRecordResponse, ModelListResponse, TableItem,
    },
};
use crate::model::{
    AiParseConfig, BridgeSettings, SiliconFlowConfig, TableWatchConfig, TaskRule, WriteField,
};
use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "tablewatch",
        version = "v1",
        description = "Bitable to chat and task bridge HTTP API"
    ),
    paths(
        system::health,
        config::save_config,
        config::update_config,
        config::get_config,
        config::test_config,
        bitables::list_bitables,
        bitables::list_tables,
        bitables::list_fields,
        records::insert_record,
        records::check_record,
        ai::ai_parse,
        ai::ai_models
    ),
    components(schemas(
        ErrorResponse,
        HealthStatus,
        BridgeSettings,
        TableWatchConfig,
        WriteField,
        TaskRule,
        AiParseConfig,
        SiliconFlowConfig,
        ConfigSavedResponse,
        CredentialCheckResponse,
        BitableItem,
        TableItem,
        FieldItem,
        InsertRecordRequest,
        InsertRecordResponse,
        CompletionStatus,
        AiParseRequest,
        AiParseResponse,
        ModelListResponse
    )),
    tags(
        (name = "system", description = "Service health"),
        (name = "config", description = "Bridge settings"),
        (name = "bitables", description = "Workspace browsing"),
        (name = "records", description = "Record insertion and completion"),
        (name = "ai", description = "AI text parsing helper")
    )
)]
pub struct ApiDoc;
