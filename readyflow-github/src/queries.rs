//! GraphQL documents used by the sync job
//!
//! Paginated queries take `$first` and `$after`, which the paginator fills
//! in; callers only supply the remaining variables.

/// Merged pull requests into a base branch, most recently updated first
pub(crate) const MERGED_PULL_REQUESTS: &str = r#"
query MergedPullRequests($owner: String!, $repo: String!, $base: String!, $first: Int!, $after: String) {
  repository(owner: $owner, name: $repo) {
    pullRequests(states: MERGED, baseRefName: $base, first: $first, after: $after, orderBy: {field: UPDATED_AT, direction: DESC}) {
      nodes {
        id
        number
        title
        url
        mergedAt
        updatedAt
        baseRefName
        bodyText
        closingIssuesReferences(first: 25) {
          nodes {
            id
            number
            repository { name owner { login } }
          }
          pageInfo { endCursor hasNextPage }
        }
      }
      pageInfo { endCursor hasNextPage }
    }
  }
}
"#;

/// Remaining closing-issue links of a pull request
pub(crate) const CLOSING_ISSUES: &str = r#"
query ClosingIssues($prId: ID!, $first: Int!, $after: String) {
  node(id: $prId) {
    ... on PullRequest {
      closingIssuesReferences(first: $first, after: $after) {
        nodes {
          id
          number
          repository { name owner { login } }
        }
        pageInfo { endCursor hasNextPage }
      }
    }
  }
}
"#;

/// Cross-reference and connection events on a pull request timeline
pub(crate) const PULL_REQUEST_TIMELINE: &str = r#"
query PullRequestTimeline($prId: ID!, $first: Int!, $after: String) {
  node(id: $prId) {
    ... on PullRequest {
      timelineItems(itemTypes: [CROSS_REFERENCED_EVENT, CONNECTED_EVENT], first: $first, after: $after) {
        nodes {
          __typename
          ... on CrossReferencedEvent {
            source {
              __typename
              ... on Issue { id number repository { name owner { login } } }
            }
          }
          ... on ConnectedEvent {
            subject {
              __typename
              ... on Issue { id number repository { name owner { login } } }
            }
          }
        }
        pageInfo { endCursor hasNextPage }
      }
    }
  }
}
"#;

/// Node id of an issue by repository and number
pub(crate) const ISSUE_ID: &str = r#"
query IssueId($owner: String!, $repo: String!, $number: Int!) {
  repository(owner: $owner, name: $repo) {
    issue(number: $number) {
      id
      number
    }
  }
}
"#;

/// Projects of an organization whose title matches a search
pub(crate) const ORGANIZATION_PROJECTS: &str = r#"
query OrganizationProjects($owner: String!, $title: String!, $first: Int!, $after: String) {
  organization(login: $owner) {
    projectsV2(query: $title, first: $first, after: $after) {
      nodes { id title number }
      pageInfo { endCursor hasNextPage }
    }
  }
}
"#;

/// Projects of a user whose title matches a search
pub(crate) const USER_PROJECTS: &str = r#"
query UserProjects($owner: String!, $title: String!, $first: Int!, $after: String) {
  user(login: $owner) {
    projectsV2(query: $title, first: $first, after: $after) {
      nodes { id title number }
      pageInfo { endCursor hasNextPage }
    }
  }
}
"#;

/// Fields of a project, with options for single-select fields
pub(crate) const PROJECT_FIELDS: &str = r#"
query ProjectFields($projectId: ID!, $first: Int!, $after: String) {
  node(id: $projectId) {
    ... on ProjectV2 {
      fields(first: $first, after: $after) {
        nodes {
          __typename
          ... on ProjectV2SingleSelectField {
            id
            name
            options { id name }
          }
        }
        pageInfo { endCursor hasNextPage }
      }
    }
  }
}
"#;

/// Board items an issue belongs to, with the status field value
pub(crate) const ISSUE_PROJECT_ITEMS: &str = r#"
query IssueProjectItems($issueId: ID!, $statusField: String!, $first: Int!, $after: String) {
  node(id: $issueId) {
    ... on Issue {
      projectItems(first: $first, after: $after) {
        nodes {
          id
          project { id }
          fieldValueByName(name: $statusField) {
            __typename
            ... on ProjectV2ItemFieldSingleSelectValue { name optionId }
          }
        }
        pageInfo { endCursor hasNextPage }
      }
    }
  }
}
"#;

/// Every item on a project board, with issue id and status field value
pub(crate) const PROJECT_ITEMS: &str = r#"
query ProjectItems($projectId: ID!, $statusField: String!, $first: Int!, $after: String) {
  node(id: $projectId) {
    ... on ProjectV2 {
      items(first: $first, after: $after) {
        nodes {
          id
          content {
            __typename
            ... on Issue { id }
          }
          fieldValueByName(name: $statusField) {
            __typename
            ... on ProjectV2ItemFieldSingleSelectValue { name optionId }
          }
        }
        pageInfo { endCursor hasNextPage }
      }
    }
  }
}
"#;

/// Comment bodies of an issue
pub(crate) const ISSUE_COMMENTS: &str = r#"
query IssueComments($issueId: ID!, $first: Int!, $after: String) {
  node(id: $issueId) {
    ... on Issue {
      comments(first: $first, after: $after) {
        nodes { body }
        pageInfo { endCursor hasNextPage }
      }
    }
  }
}
"#;

/// Set a single-select field value on a board item
pub(crate) const UPDATE_ITEM_STATUS: &str = r#"
mutation UpdateItemStatus($projectId: ID!, $itemId: ID!, $fieldId: ID!, $optionId: String!) {
  updateProjectV2ItemFieldValue(input: {
    projectId: $projectId,
    itemId: $itemId,
    fieldId: $fieldId,
    value: { singleSelectOptionId: $optionId }
  }) {
    projectV2Item { id }
  }
}
"#;

/// Post a comment on an issue
pub(crate) const ADD_COMMENT: &str = r#"
mutation AddComment($subjectId: ID!, $body: String!) {
  addComment(input: {subjectId: $subjectId, body: $body}) {
    commentEdge {
      node { id }
    }
  }
}
"#;
