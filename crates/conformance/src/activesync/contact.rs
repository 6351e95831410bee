//! Contact class application data
//!
//! [`Contact`] has one optional field per Contact class element. The same
//! struct is used for Sync Add/Change application data and for parsed
//! responses; in a Change request every `None` field is omitted (ghosted).

use chrono::{DateTime, Utc};

/// Largest decoded Picture a server accepts in Sync Add
pub const MAX_PICTURE_BYTES: usize = 48 * 1024;

/// Body element type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BodyType {
    PlainText = 1,
    Html = 2,
    Rtf = 3,
    Mime = 4,
}

/// AirSyncBase Body
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Body {
    pub body_type: BodyType,
    pub data: Option<String>,
    pub estimated_data_size: Option<usize>,
    pub truncated: bool,
}

impl Body {
    pub fn plain_text(data: impl Into<String>) -> Self {
        let data = data.into();
        Self {
            body_type: BodyType::PlainText,
            estimated_data_size: Some(data.len()),
            data: Some(data),
            truncated: false,
        }
    }

    /// Copy of this body cut to `max_chars` characters
    pub fn truncated_to(&self, max_chars: usize) -> Self {
        let mut body = self.clone();
        if let Some(data) = &self.data
            && data.chars().count() > max_chars
        {
            body.data = Some(data.chars().take(max_chars).collect());
            body.truncated = true;
        }
        body
    }
}

/// Expands `$callback!` with every `field => Variant = "ElementName"` triple.
macro_rules! with_contact_fields {
    ($callback:ident) => {
        $callback! {
            file_as => FileAs = "FileAs",
            account_name => AccountName = "AccountName",
            alias => Alias = "Alias",
            anniversary => Anniversary = "Anniversary",
            assistant_name => AssistantName = "AssistantName",
            assistant_phone_number => AssistantPhoneNumber = "AssistantPhoneNumber",
            birthday => Birthday = "Birthday",
            body => Body = "Body",
            business_address_city => BusinessAddressCity = "BusinessAddressCity",
            business_address_country => BusinessAddressCountry = "BusinessAddressCountry",
            business_address_postal_code => BusinessAddressPostalCode = "BusinessAddressPostalCode",
            business_address_state => BusinessAddressState = "BusinessAddressState",
            business_address_street => BusinessAddressStreet = "BusinessAddressStreet",
            business_fax_number => BusinessFaxNumber = "BusinessFaxNumber",
            business_phone_number => BusinessPhoneNumber = "BusinessPhoneNumber",
            business2_phone_number => Business2PhoneNumber = "Business2PhoneNumber",
            car_phone_number => CarPhoneNumber = "CarPhoneNumber",
            categories => Categories = "Categories",
            children => Children = "Children",
            company_main_phone => CompanyMainPhone = "CompanyMainPhone",
            company_name => CompanyName = "CompanyName",
            customer_id => CustomerId = "CustomerId",
            department => Department = "Department",
            email1_address => Email1Address = "Email1Address",
            email2_address => Email2Address = "Email2Address",
            email3_address => Email3Address = "Email3Address",
            first_name => FirstName = "FirstName",
            government_id => GovernmentId = "GovernmentId",
            home_address_city => HomeAddressCity = "HomeAddressCity",
            home_address_country => HomeAddressCountry = "HomeAddressCountry",
            home_address_postal_code => HomeAddressPostalCode = "HomeAddressPostalCode",
            home_address_state => HomeAddressState = "HomeAddressState",
            home_address_street => HomeAddressStreet = "HomeAddressStreet",
            home_fax_number => HomeFaxNumber = "HomeFaxNumber",
            home_phone_number => HomePhoneNumber = "HomePhoneNumber",
            home2_phone_number => Home2PhoneNumber = "Home2PhoneNumber",
            im_address => ImAddress = "IMAddress",
            im_address2 => ImAddress2 = "IMAddress2",
            im_address3 => ImAddress3 = "IMAddress3",
            job_title => JobTitle = "JobTitle",
            last_name => LastName = "LastName",
            manager_name => ManagerName = "ManagerName",
            middle_name => MiddleName = "MiddleName",
            mms => Mms = "MMS",
            mobile_phone_number => MobilePhoneNumber = "MobilePhoneNumber",
            nick_name => NickName = "NickName",
            office_location => OfficeLocation = "OfficeLocation",
            other_address_city => OtherAddressCity = "OtherAddressCity",
            other_address_country => OtherAddressCountry = "OtherAddressCountry",
            other_address_postal_code => OtherAddressPostalCode = "OtherAddressPostalCode",
            other_address_state => OtherAddressState = "OtherAddressState",
            other_address_street => OtherAddressStreet = "OtherAddressStreet",
            pager_number => PagerNumber = "PagerNumber",
            picture => Picture = "Picture",
            radio_phone_number => RadioPhoneNumber = "RadioPhoneNumber",
            spouse => Spouse = "Spouse",
            suffix => Suffix = "Suffix",
            title => Title = "Title",
            web_page => WebPage = "WebPage",
            weighted_rank => WeightedRank = "WeightedRank",
            yomi_company_name => YomiCompanyName = "YomiCompanyName",
            yomi_first_name => YomiFirstName = "YomiFirstName",
            yomi_last_name => YomiLastName = "YomiLastName",
        }
    };
}

macro_rules! declare_contact_field {
    ($($field:ident => $variant:ident = $element:literal),* $(,)?) => {
        /// Contact class element name, used in Supported and Schema lists
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum ContactField {
            $($variant),*
        }

        impl ContactField {
            pub const ALL: &'static [ContactField] = &[$(ContactField::$variant),*];

            /// Element name on the wire
            pub fn element_name(self) -> &'static str {
                match self {
                    $(ContactField::$variant => $element),*
                }
            }
        }
    };
}

with_contact_fields!(declare_contact_field);

/// Contact class item
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Contact {
    pub file_as: Option<String>,
    pub account_name: Option<String>,
    /// Only present on recipient information cache entries, if at all
    pub alias: Option<String>,
    pub anniversary: Option<DateTime<Utc>>,
    pub assistant_name: Option<String>,
    pub assistant_phone_number: Option<String>,
    pub birthday: Option<DateTime<Utc>>,
    pub body: Option<Body>,
    pub business_address_city: Option<String>,
    pub business_address_country: Option<String>,
    pub business_address_postal_code: Option<String>,
    pub business_address_state: Option<String>,
    pub business_address_street: Option<String>,
    pub business_fax_number: Option<String>,
    pub business_phone_number: Option<String>,
    pub business2_phone_number: Option<String>,
    pub car_phone_number: Option<String>,
    pub categories: Option<Vec<String>>,
    pub children: Option<Vec<String>>,
    pub company_main_phone: Option<String>,
    pub company_name: Option<String>,
    pub customer_id: Option<String>,
    pub department: Option<String>,
    pub email1_address: Option<String>,
    pub email2_address: Option<String>,
    pub email3_address: Option<String>,
    pub first_name: Option<String>,
    pub government_id: Option<String>,
    pub home_address_city: Option<String>,
    pub home_address_country: Option<String>,
    pub home_address_postal_code: Option<String>,
    pub home_address_state: Option<String>,
    pub home_address_street: Option<String>,
    pub home_fax_number: Option<String>,
    pub home_phone_number: Option<String>,
    pub home2_phone_number: Option<String>,
    pub im_address: Option<String>,
    pub im_address2: Option<String>,
    pub im_address3: Option<String>,
    pub job_title: Option<String>,
    pub last_name: Option<String>,
    pub manager_name: Option<String>,
    pub middle_name: Option<String>,
    pub mms: Option<String>,
    pub mobile_phone_number: Option<String>,
    pub nick_name: Option<String>,
    pub office_location: Option<String>,
    pub other_address_city: Option<String>,
    pub other_address_country: Option<String>,
    pub other_address_postal_code: Option<String>,
    pub other_address_state: Option<String>,
    pub other_address_street: Option<String>,
    pub pager_number: Option<String>,
    /// Base64-encoded image
    pub picture: Option<String>,
    pub radio_phone_number: Option<String>,
    pub spouse: Option<String>,
    pub suffix: Option<String>,
    pub title: Option<String>,
    pub web_page: Option<String>,
    /// Server-computed rank, only on recipient information cache entries
    pub weighted_rank: Option<i32>,
    pub yomi_company_name: Option<String>,
    pub yomi_first_name: Option<String>,
    pub yomi_last_name: Option<String>,
}

impl Contact {
    pub fn with_file_as(file_as: impl Into<String>) -> Self {
        Self {
            file_as: Some(file_as.into()),
            ..Self::default()
        }
    }

    /// Apply a Sync Change on top of this stored contact.
    ///
    /// Elements present in `change` replace the stored value. An absent
    /// element is cleared when the client listed it as supported, or when the
    /// client sent no Supported list at all; otherwise it is ghosted and the
    /// stored value is kept.
    pub fn apply_change(&mut self, change: Contact, supported: Option<&[ContactField]>) {
        let clears = |field: ContactField| supported.is_none_or(|list| list.contains(&field));

        macro_rules! merge {
            ($($field:ident => $variant:ident = $element:literal),* $(,)?) => {
                $(
                    match change.$field {
                        Some(value) => self.$field = Some(value),
                        None if clears(ContactField::$variant) => self.$field = None,
                        None => {}
                    }
                )*
            };
        }

        with_contact_fields!(merge);
    }

    /// Copy holding only the elements listed in `schema`
    pub fn project(&self, schema: &[ContactField]) -> Contact {
        let mut projected = Contact::default();

        macro_rules! keep {
            ($($field:ident => $variant:ident = $element:literal),* $(,)?) => {
                $(
                    if schema.contains(&ContactField::$variant) {
                        projected.$field = self.$field.clone();
                    }
                )*
            };
        }

        with_contact_fields!(keep);
        projected
    }

    /// Elements that carry a value
    pub fn present_fields(&self) -> Vec<ContactField> {
        let mut fields = Vec::new();

        macro_rules! collect {
            ($($field:ident => $variant:ident = $element:literal),* $(,)?) => {
                $(
                    if self.$field.is_some() {
                        fields.push(ContactField::$variant);
                    }
                )*
            };
        }

        with_contact_fields!(collect);
        fields
    }

    /// Value of one element rendered as text, for element-by-element checks
    pub fn element_text(&self, field: ContactField) -> Option<String> {
        macro_rules! render {
            ($($f:ident => $variant:ident = $element:literal),* $(,)?) => {
                match field {
                    $(ContactField::$variant => self.$f.as_ref().map(ElementText::element_text)),*
                }
            };
        }

        with_contact_fields!(render)
    }
}

trait ElementText {
    fn element_text(&self) -> String;
}

impl ElementText for String {
    fn element_text(&self) -> String {
        self.clone()
    }
}

impl ElementText for i32 {
    fn element_text(&self) -> String {
        self.to_string()
    }
}

impl ElementText for DateTime<Utc> {
    fn element_text(&self) -> String {
        self.format("%Y-%m-%dT%H:%M:%S%.3fZ").to_string()
    }
}

impl ElementText for Vec<String> {
    fn element_text(&self) -> String {
        self.join(";")
    }
}

impl ElementText for Body {
    fn element_text(&self) -> String {
        self.data.clone().unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stored() -> Contact {
        Contact {
            file_as: Some("Clinton, Aaron".into()),
            assistant_name: Some("Assistant".into()),
            job_title: Some("Tester".into()),
            body: Some(Body::plain_text("notes")),
            ..Contact::default()
        }
    }

    #[test]
    fn test_element_names() {
        assert_eq!(ContactField::ImAddress.element_name(), "IMAddress");
        assert_eq!(ContactField::Mms.element_name(), "MMS");
        assert_eq!(ContactField::ALL.len(), 63);
    }

    #[test]
    fn test_change_without_supported_list_replaces() {
        let mut contact = stored();
        let change = Contact {
            file_as: Some("Clinton, Aaron".into()),
            job_title: Some("Lead".into()),
            ..Contact::default()
        };
        contact.apply_change(change, None);

        assert_eq!(contact.job_title.as_deref(), Some("Lead"));
        assert!(contact.assistant_name.is_none());
        assert!(contact.body.is_none());
    }

    #[test]
    fn test_ghosted_elements_are_preserved() {
        let mut contact = stored();
        let change = Contact {
            job_title: Some("Lead".into()),
            ..Contact::default()
        };
        contact.apply_change(change, Some(&[ContactField::JobTitle]));

        assert_eq!(contact.job_title.as_deref(), Some("Lead"));
        assert_eq!(contact.assistant_name.as_deref(), Some("Assistant"));
        assert_eq!(contact.file_as.as_deref(), Some("Clinton, Aaron"));
        assert!(contact.body.is_some());
    }

    #[test]
    fn test_supported_but_absent_element_is_cleared() {
        let mut contact = stored();
        contact.apply_change(
            Contact::default(),
            Some(&[ContactField::AssistantName]),
        );

        assert!(contact.assistant_name.is_none());
        assert_eq!(contact.job_title.as_deref(), Some("Tester"));
    }

    #[test]
    fn test_project() {
        let projected = stored().project(&[ContactField::FileAs, ContactField::Body]);
        assert_eq!(
            projected.present_fields(),
            vec![ContactField::FileAs, ContactField::Body]
        );
    }

    #[test]
    fn test_element_text() {
        let contact = Contact {
            categories: Some(vec!["Business".into(), "Social".into()]),
            anniversary: "2012-10-01T16:00:00Z".parse().ok(),
            ..stored()
        };
        assert_eq!(contact.element_text(ContactField::JobTitle).as_deref(), Some("Tester"));
        assert_eq!(contact.element_text(ContactField::Body).as_deref(), Some("notes"));
        assert_eq!(
            contact.element_text(ContactField::Categories).as_deref(),
            Some("Business;Social")
        );
        assert_eq!(
            contact.element_text(ContactField::Anniversary).as_deref(),
            Some("2012-10-01T16:00:00.000Z")
        );
        assert_eq!(contact.element_text(ContactField::Spouse), None);
    }

    #[test]
    fn test_body_truncation() {
        let body = Body::plain_text("0123456789abc");
        let truncated = body.truncated_to(8);
        assert_eq!(truncated.data.as_deref(), Some("01234567"));
        assert!(truncated.truncated);

        let whole = body.truncated_to(100);
        assert_eq!(whole, body);
    }
}
