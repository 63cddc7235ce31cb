

use rmcp::{
    handler::server::{
        router::tool::ToolRouter,
        router::prompt::PromptRouter,
        wrapper::Parameters,
    },
    model::*,
    tool, tool_handler, tool_router,
    prompt, prompt_handler, prompt_router,
    transport::stdio,
    service::RequestContext,
    ErrorData as McpError, RoleServer, ServerHandler, ServiceExt,
};
use rmcp::schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use tracing::{info, warn};

use crate::core::config::RagConfig;
use crate::knowledge::context::{augment_system_prompt_with_heading, format_context_with_heading, DEFAULT_SYSTEM_PROMPT};
use crate::knowledge::{KnowledgeIndex, RetrieveOptions};
use crate::utils::preview;


#[derive(Debug, Deserialize, JsonSchema)]
#[schemars(crate = "rmcp::schemars")]
pub struct RetrieveComplianceParams {
    #[schemars(description = "Free-text compliance question")]
    pub query: String,
    #[schemars(description = "Max results (default: 3, negative returns nothing)")]
    pub top_k: Option<i64>,
    #[schemars(description = "Inclusive similarity floor in [0, 1] (default: 0.1)")]
    pub min_score: Option<f64>,
    #[schemars(description = "Only entries for these readers, e.g. 'freelancer', 'sme_owner', 'hr_ops'")]
    pub audience: Option<Vec<String>>,
    #[schemars(description = "Only entries carrying at least one of these tags")]
    pub tags: Option<Vec<String>>,
    #[schemars(description = "Return the formatted prompt context instead of JSON results")]
    pub as_context: Option<bool>,
}

#[derive(Debug, Deserialize, JsonSchema)]
#[schemars(crate = "rmcp::schemars")]
pub struct GetComplianceEntryParams {
    #[schemars(description = "Knowledge entry id, e.g. 'firs-002'")]
    pub id: String,
}

#[derive(Debug, Deserialize, JsonSchema)]
#[schemars(crate = "rmcp::schemars")]
pub struct SearchByTagsParams {
    #[schemars(description = "Tags to match (any), e.g. ['vat', 'paye']")]
    pub tags: Vec<String>,
}


#[derive(Debug, Serialize, Deserialize, JsonSchema)]
#[schemars(crate = "rmcp::schemars")]
pub struct ComplianceAnswerArgs {
    #[schemars(description = "The user's question")]
    pub question: String,
    #[schemars(description = "Optional system prompt to augment")]
    pub system_prompt: Option<String>,
}


#[derive(Clone)]
pub struct LexragMcpServer {
    index: Arc<KnowledgeIndex>,
    config: Arc<RagConfig>,
    tool_router: ToolRouter<Self>,
    prompt_router: PromptRouter<Self>,
}

impl LexragMcpServer {

    pub fn new(index: Arc<KnowledgeIndex>, config: RagConfig) -> Self {
        Self {
            index,
            config: Arc::new(config),
            tool_router: Self::tool_router(),
            prompt_router: Self::prompt_router(),
        }
    }


    fn result_to_json<T: Serialize>(result: T) -> Result<String, McpError> {
        serde_json::to_string_pretty(&result)
            .map_err(|e| McpError::internal_error(e.to_string(), None))
    }

    fn options_from(&self, params: &RetrieveComplianceParams) -> RetrieveOptions {
        let mut options = RetrieveOptions::from_config(&self.config);
        if let Some(top_k) = params.top_k {
            options = options.top_k_signed(top_k);
        }
        if let Some(min_score) = params.min_score {
            options = options.min_score(min_score);
        }
        if let Some(audience) = &params.audience {
            options = options.audience(audience.iter().cloned());
        }
        if let Some(tags) = &params.tags {
            options = options.tags(tags.iter().cloned());
        }
        options
    }
}

#[tool_router]
impl LexragMcpServer {

    #[tool(description = "Retrieve Nigerian compliance knowledge (CAC, FIRS tax, NDPA, PenCom) relevant to a question. Returns: [{entry, relevance_score, matched_terms}] or a markdown context block when as_context=true")]
    async fn retrieve_compliance(
        &self,
        Parameters(params): Parameters<RetrieveComplianceParams>,
    ) -> Result<CallToolResult, McpError> {
        let options = self.options_from(&params);
        info!(
            "🔍 Retrieving: '{}' [top_k={}, min_score={}]",
            preview(&params.query, 50),
            options.top_k,
            options.min_score
        );

        let results = self.index.retrieve(&params.query, &options).await;
        info!("✅ Found {} entries", results.len());

        let text = if params.as_context.unwrap_or(false) {
            if results.is_empty() {
                "No relevant compliance context found.".to_string()
            } else {
                format_context_with_heading(&results, &self.config.context_heading)
            }
        } else {
            Self::result_to_json(&results)?
        };
        Ok(CallToolResult::success(vec![Content::text(text)]))
    }


    #[tool(description = "Get one compliance knowledge entry by id. Returns: {id, topic, question, answer_markdown, key_points, compliance_checklist, citations, tags, ...}")]
    async fn get_compliance_entry(
        &self,
        Parameters(params): Parameters<GetComplianceEntryParams>,
    ) -> Result<CallToolResult, McpError> {
        match self.index.get_by_id(&params.id).await {
            Some(entry) => {
                let json = Self::result_to_json(&entry)?;
                Ok(CallToolResult::success(vec![Content::text(json)]))
            }
            None => {
                warn!("⚠️ Unknown knowledge entry: {}", params.id);
                Err(McpError::invalid_params(
                    format!("Unknown knowledge entry: {}", params.id),
                    Some(json!({ "id": params.id })),
                ))
            }
        }
    }


    #[tool(description = "List compliance entries sharing any of the given tags, in knowledge base order. Returns: [entry]")]
    async fn search_compliance_by_tags(
        &self,
        Parameters(params): Parameters<SearchByTagsParams>,
    ) -> Result<CallToolResult, McpError> {
        let entries = self.index.search_by_tags(&params.tags).await;
        info!("🏷️ {} entries tagged {:?}", entries.len(), params.tags);

        let json = Self::result_to_json(&entries)?;
        Ok(CallToolResult::success(vec![Content::text(json)]))
    }


    #[tool(description = "List every tag in the compliance knowledge base, sorted. Returns: [tag]")]
    async fn list_compliance_tags(&self) -> Result<CallToolResult, McpError> {
        let tags = self.index.all_tags().await;
        let json = Self::result_to_json(&tags)?;
        Ok(CallToolResult::success(vec![Content::text(json)]))
    }
}


#[prompt_router]
impl LexragMcpServer {

    #[prompt(
        name = "compliance_answer",
        description = "System prompt grounded in retrieved Nigerian compliance knowledge, followed by the question"
    )]
    async fn compliance_answer(
        &self,
        Parameters(args): Parameters<ComplianceAnswerArgs>,
    ) -> Result<GetPromptResult, McpError> {
        let results = self.index.retrieve(&args.question, &RetrieveOptions::for_chat()).await;
        let base = args.system_prompt.as_deref().unwrap_or(DEFAULT_SYSTEM_PROMPT);
        let system_prompt =
            augment_system_prompt_with_heading(base, &results, &self.config.context_heading);

        let messages = vec![
            PromptMessage::new_text(PromptMessageRole::User, system_prompt),
            PromptMessage::new_text(PromptMessageRole::User, args.question.clone()),
        ];

        Ok(GetPromptResult {
            description: Some(format!(
                "Compliance answer grounded in {} knowledge entries",
                results.len()
            )),
            messages,
        })
    }
}


#[tool_handler]
#[prompt_handler]
impl ServerHandler for LexragMcpServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: ProtocolVersion::V_2024_11_05,
            capabilities: ServerCapabilities::builder()
                .enable_tools()
                .enable_prompts()
                .enable_resources()
                .build(),
            server_info: Implementation {
                name: "lexrag".into(),
                version: env!("CARGO_PKG_VERSION").into(),
                ..Default::default()
            },
            instructions: Some(
                "Nigerian compliance knowledge retrieval. Use retrieve_compliance to ground answers \
                 about CAC registration, FIRS taxes (TIN, VAT, PAYE), NDPA data protection and \
                 PenCom pensions; the compliance_answer prompt builds a grounded system prompt."
                    .to_string(),
            ),
        }
    }


    async fn list_resources(
        &self,
        _request: Option<PaginatedRequestParam>,
        _ctx: RequestContext<RoleServer>,
    ) -> Result<ListResourcesResult, McpError> {
        Ok(ListResourcesResult {
            resources: vec![
                RawResource::new("config://lexrag", "lexrag-config".to_string())
                    .no_annotation(),
            ],
            next_cursor: None,
        })
    }

    async fn read_resource(
        &self,
        ReadResourceRequestParam { uri }: ReadResourceRequestParam,
        _ctx: RequestContext<RoleServer>,
    ) -> Result<ReadResourceResult, McpError> {
        match uri.as_str() {
            "config://lexrag" => {
                let content = serde_json::to_string_pretty(&json!({
                    "version": env!("CARGO_PKG_VERSION"),
                    "knowledge_path": self.config.knowledge_path,
                    "default_top_k": self.config.default_top_k,
                    "default_min_score": self.config.default_min_score,
                    "entries": self.index.len().await,
                    "tags": self.index.all_tags().await,
                    "tools": [
                        "retrieve_compliance",
                        "get_compliance_entry",
                        "search_compliance_by_tags",
                        "list_compliance_tags",
                    ],
                })).unwrap_or_default();

                Ok(ReadResourceResult {
                    contents: vec![ResourceContents::text(content, uri)],
                })
            }
            _ => Err(McpError::resource_not_found(
                format!("Unknown resource: {}", uri),
                Some(json!({ "uri": uri })),
            )),
        }
    }
}


pub async fn run_server() -> anyhow::Result<()> {
    info!("🚀 Initializing lexrag MCP server...");

    let config = RagConfig::from_env_or_file()?;
    let index = Arc::new(KnowledgeIndex::from_config(&config));

    match index.try_initialize().await {
        Ok(count) => info!("✅ Knowledge index loaded: {} entries", count),
        Err(e) => warn!("⚠️ Knowledge index unavailable ({}), serving without context", e),
    }
    info!(
        "   📊 Defaults: top_k={}, min_score={}",
        config.default_top_k,
        config.default_min_score
    );

    let server = LexragMcpServer::new(index, config);
    let service = server.serve(stdio()).await?;
    service.waiting().await?;

    Ok(())
}
