use exabridge_core::{
    AnswerRequest, AnswerResponse, ContentsRequest, ContentsResponse, FindSimilarRequest, Result,
    SearchRequest, SearchResponse,
};

use crate::ExaClient;

impl ExaClient {
    pub async fn search(&self, req: &SearchRequest) -> Result<SearchResponse> {
        req.validate()?;
        tracing::debug!(
            num_results = req.num_results,
            category = ?req.category,
            "exa search"
        );
        self.post_json("search", &["search"], req).await
    }

    pub async fn find_similar(&self, req: &FindSimilarRequest) -> Result<SearchResponse> {
        req.validate()?;
        self.post_json("find_similar", &["findSimilar"], req).await
    }

    pub async fn contents(&self, req: &ContentsRequest) -> Result<ContentsResponse> {
        req.validate()?;
        tracing::debug!(urls = req.urls.len(), "exa contents");
        self.post_json("contents", &["contents"], req).await
    }

    pub async fn answer(&self, req: &AnswerRequest) -> Result<AnswerResponse> {
        req.validate()?;
        self.post_json("answer", &["answer"], req).await
    }
}
