//! Canned Reddit posts for tests and offline demos. Never mixed into live data.

use crate::reddit::{RedditListing, RedditListingChild, RedditListingData, RedditPostData};
use chrono::Utc;
use painpoint_core::RawPost;

// (id, title, selftext, subreddit, score, comments)
const MOCK_POSTS: &[(&str, &str, &str, &str, i64, i64)] = &[
    (
        "1",
        "I wish there was a tool to automate my social media scheduling",
        "Managing multiple platforms is exhausting. Looking for something that can post to Twitter, LinkedIn, and Instagram at once.",
        "SaaS",
        156,
        34,
    ),
    (
        "2",
        "Frustrated with existing CRM tools - they are all too complex",
        "I just need something simple for a small team. Salesforce and HubSpot are overkill.",
        "startups",
        89,
        23,
    ),
    (
        "3",
        "Looking for a tool to track competitor pricing changes",
        "Need to monitor when competitors change their prices. Manual checking is not scalable.",
        "Entrepreneur",
        67,
        12,
    ),
    (
        "4",
        "Need an app that converts Figma designs to React components",
        "Tired of manually converting designs. AI should be able to do this by now.",
        "webdev",
        234,
        56,
    ),
    (
        "5",
        "I wish there was a simple invoicing tool for freelancers",
        "Most tools are designed for agencies. I just need to send 5-10 invoices a month.",
        "SideProject",
        45,
        18,
    ),
    (
        "6",
        "Looking for API monitoring that actually alerts me before customers notice",
        "Current monitoring tools only tell me after things are broken. Need predictive alerts.",
        "SaaS",
        123,
        29,
    ),
    (
        "7",
        "Frustrated with email marketing platforms - deliverability is terrible",
        "Tried Mailchimp, SendGrid, and others. Half my emails go to spam.",
        "indiehackers",
        78,
        41,
    ),
    (
        "8",
        "Need a tool for managing customer feedback across multiple channels",
        "Getting feedback from email, Twitter, Discord, and support tickets. Need one place to see it all.",
        "startups",
        92,
        15,
    ),
];

/// Eight posts spaced an hour apart, the newest one hour old.
pub fn mock_reddit_listing() -> RedditListing<RedditPostData> {
    let now = Utc::now().timestamp() as f64;

    let children = MOCK_POSTS
        .iter()
        .enumerate()
        .map(
            |(i, (id, title, selftext, subreddit, score, comments))| RedditListingChild {
                kind: "t3".to_string(),
                data: RedditPostData {
                    id: id.to_string(),
                    title: title.to_string(),
                    selftext: selftext.to_string(),
                    subreddit: subreddit.to_string(),
                    permalink: format!("/r/{}/comments/{}/mock", subreddit, id),
                    url: String::new(),
                    score: *score,
                    num_comments: *comments,
                    created_utc: now - 3600.0 * (i as f64 + 1.0),
                },
            },
        )
        .collect();

    RedditListing {
        kind: "Listing".to_string(),
        data: RedditListingData {
            children,
            after: None,
            before: None,
        },
    }
}

pub fn mock_reddit_posts() -> Vec<RawPost> {
    mock_reddit_listing()
        .data
        .children
        .into_iter()
        .map(|child| child.data.into())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use painpoint_core::Source;

    #[test]
    fn test_mock_posts_shape() {
        let posts = mock_reddit_posts();
        assert_eq!(posts.len(), 8);
        assert!(posts.iter().all(|p| p.source == Source::Reddit));
        assert_eq!(posts[0].url, "https://reddit.com/r/SaaS/comments/1/mock");
        assert!(posts[0].created_at > posts[7].created_at);
    }
}
