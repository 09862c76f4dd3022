use super::OutgoingMail;

pub fn verify_email(to: &str, base_url: &str, token: &str) -> OutgoingMail {
    OutgoingMail {
        to: to.to_string(),
        subject: "Verify your Applynify email".into(),
        text: format!(
            "Welcome to Applynify!\n\nConfirm your email address by opening:\n{base_url}/verify-email?token={token}\n\nThe link expires in 24 hours."
        ),
        reply_to: None,
    }
}

pub fn reset_password(to: &str, base_url: &str, token: &str) -> OutgoingMail {
    OutgoingMail {
        to: to.to_string(),
        subject: "Reset your Applynify password".into(),
        text: format!(
            "Someone asked to reset the password for this account.\n\nChoose a new password here:\n{base_url}/reset-password?token={token}\n\nThe link expires in 1 hour. Ignore this mail if it wasn't you."
        ),
        reply_to: None,
    }
}

pub fn new_message(to: &str, name: Option<&str>, base_url: &str) -> OutgoingMail {
    let greeting = name.map_or_else(|| "Hi".to_string(), |n| format!("Hi {n}"));
    OutgoingMail {
        to: to.to_string(),
        subject: "You have a new message from Applynify".into(),
        text: format!(
            "{greeting},\n\nOur team sent you a message. Read it on your dashboard:\n{base_url}/dashboard/messages"
        ),
        reply_to: None,
    }
}

pub fn contact_request(support: &str, name: &str, email: &str, message: &str) -> OutgoingMail {
    OutgoingMail {
        to: support.to_string(),
        subject: format!("Contact form: {name}"),
        text: format!("From: {name} <{email}>\n\n{message}"),
        reply_to: Some(email.to_string()),
    }
}
