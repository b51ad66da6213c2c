pub mod blog_post;
pub mod blog_post_factory;
pub mod contact_message;
pub mod faq_feedback;
pub mod faq_question;
pub mod faq_search_log;
